use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory before the user config directory
const LOCAL_CONFIG_FILE: &str = "vimeo-transcript.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Headless browser settings
    pub browser: BrowserSettings,

    /// Caption download settings
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Chrome/Chromium executable (auto-detected if not set)
    pub executable: Option<PathBuf>,

    /// Run without a visible window
    pub headless: bool,

    /// Keep the Chrome sandbox enabled
    pub sandbox: bool,

    /// Viewport width in pixels
    pub window_width: u32,

    /// Viewport height in pixels
    pub window_height: u32,

    /// User agent for the page and the caption download
    pub user_agent: String,

    /// Upper bound for a page navigation
    pub navigation_timeout_secs: u64,

    /// Upper bound for the player to show up after navigation
    pub player_timeout_secs: u64,

    /// Delay between player readiness checks
    pub poll_interval_ms: u64,

    /// Substring identifying the embedded player iframe
    pub player_frame_marker: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Caption request timeout
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates from the caption CDN
    pub accept_invalid_certs: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            sandbox: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"
                .to_string(),
            navigation_timeout_secs: 60,
            player_timeout_secs: 15,
            poll_interval_ms: 250,
            player_frame_marker: "player.vimeo".to_string(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            accept_invalid_certs: true,
        }
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn player_timeout(&self) -> Duration {
        Duration::from_secs(self.player_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from an explicit file, a discovered file, or built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let config = match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;
                Self::from_yaml(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };

        Ok(config)
    }

    /// Parse and validate a YAML document; missing fields take their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Find a configuration file without creating one
    fn discover() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("vimeo-transcript").join("config.yaml"))
            .filter(|path| path.exists())
    }

    fn validate(&self) -> Result<()> {
        let browser = &self.browser;
        if browser.navigation_timeout_secs == 0 || browser.player_timeout_secs == 0 {
            anyhow::bail!("Browser timeouts must be greater than zero");
        }
        if browser.poll_interval_ms == 0 {
            anyhow::bail!("Player poll interval must be greater than zero");
        }
        if browser.window_width == 0 || browser.window_height == 0 {
            anyhow::bail!("Browser window size must be non-zero");
        }
        if browser.player_frame_marker.trim().is_empty() {
            anyhow::bail!("Player frame marker must not be empty");
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("HTTP timeout must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_browser_profile() {
        let config = Config::default();
        assert!(config.browser.headless);
        assert_eq!((config.browser.window_width, config.browser.window_height), (1920, 1080));
        assert_eq!(config.browser.navigation_timeout(), Duration::from_secs(60));
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("browser:\n  headless: false\n  player_timeout_secs: 5\n").unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.player_timeout(), Duration::from_secs(5));
        assert_eq!(config.browser.player_frame_marker, "player.vimeo");
        assert!(config.http.accept_invalid_certs);
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        assert!(Config::from_yaml("http:\n  timeout_secs: 0\n").is_err());
        assert!(Config::from_yaml("browser:\n  poll_interval_ms: 0\n").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "http:\n  accept_invalid_certs: false\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.http.accept_invalid_certs);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }
}
