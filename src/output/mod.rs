use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::transcript::Transcript;
use crate::{Result, TranscriptError};

/// Write the transcript to `path`, or stdout when no path is given
pub fn write_transcript(transcript: &Transcript, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => save_to_file(&transcript.content, path),
        None => print_to_stdout(&transcript.content),
    }
}

/// Replace `path` with `content` in one step; a failed write leaves any existing file untouched
pub fn save_to_file(content: &[u8], path: &Path) -> Result<()> {
    let io_error = |source: std::io::Error| TranscriptError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(content).map_err(io_error)?;
    file.as_file()
        .set_permissions(target_permissions(path, file.as_file())?)
        .map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;

    tracing::debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Permissions the written file should end up with: those of the file being replaced,
/// otherwise an ordinary world-readable file rather than the temp file's owner-only mode
fn target_permissions(path: &Path, temp: &fs::File) -> Result<fs::Permissions> {
    if let Ok(existing) = fs_err::metadata(path) {
        return Ok(existing.permissions());
    }

    let permissions = temp
        .metadata()
        .map_err(|source| TranscriptError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .permissions();

    #[cfg(unix)]
    let permissions = {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = permissions;
        permissions.set_mode(NEW_FILE_MODE);
        permissions
    };

    Ok(permissions)
}

#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Print the transcript to stdout in a single write
pub fn print_to_stdout(content: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(content)
        .and_then(|_| stdout.flush())
        .map_err(|source| TranscriptError::Io {
            path: PathBuf::from("<stdout>"),
            source,
        })?;
    Ok(())
}
