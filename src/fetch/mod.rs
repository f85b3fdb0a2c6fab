use reqwest::header::{COOKIE, REFERER};
use reqwest::Client;

use crate::config::HttpSettings;
use crate::extractors::CaptionTrack;
use crate::utils::format_file_size;
use crate::{Result, TranscriptError};

#[cfg(test)]
pub(crate) mod test_server;

/// Downloads caption payloads with the page session's cookies
pub struct CaptionFetcher {
    client: Client,
}

impl CaptionFetcher {
    pub fn new(settings: &HttpSettings, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(user_agent)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| TranscriptError::Fetch(format!("could not build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET the caption track and return the raw payload
    pub async fn fetch(&self, track: &CaptionTrack) -> Result<Vec<u8>> {
        tracing::info!("Downloading transcript...");
        tracing::debug!("Caption URL: {}", track.url);

        let mut request = self.client.get(track.url.clone());
        if let Some(cookies) = &track.cookie_header {
            request = request.header(COOKIE, cookies);
        }
        if let Some(referer) = &track.referer {
            request = request.header(REFERER, referer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TranscriptError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptError::Fetch(format!("HTTP {} from {}", status, track.url)).into());
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| TranscriptError::Fetch(e.to_string()))?;

        tracing::debug!("Downloaded {}", format_file_size(payload.len() as u64));
        Ok(payload.to_vec())
    }
}
