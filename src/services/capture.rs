use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Client for the source directory and the per-source frame capture endpoint.
pub struct CaptureClient {
    http: Client,
    directory_url: String,
    capture_url: String,
}

#[derive(Debug, Deserialize)]
struct ActiveSourcesResponse {
    sources: Vec<String>,
}

/// One fetched frame: raw bytes plus the content type the source reported.
pub struct FetchedFrame {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl CaptureClient {
    pub fn new(directory_url: &str, capture_url: &str) -> Result<Self, CaptureError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(CaptureError::Http)?;
        Ok(Self {
            http,
            directory_url: directory_url.trim_end_matches('/').to_string(),
            capture_url: capture_url.trim_end_matches('/').to_string(),
        })
    }

    /// List currently active sources from the directory service.
    pub async fn active_sources(&self) -> Result<Vec<String>, CaptureError> {
        let url = format!("{}/sources/active", self.directory_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(CaptureError::Http)?
            .error_for_status()
            .map_err(CaptureError::Http)?;

        let body: ActiveSourcesResponse = response.json().await.map_err(CaptureError::Http)?;
        Ok(body.sources)
    }

    /// Fetch one representative frame for a source. Non-image responses are
    /// rejected here so the collector never uploads junk.
    pub async fn fetch_frame(&self, source_id: &str) -> Result<FetchedFrame, CaptureError> {
        let url = format!("{}/{}/frame", self.capture_url, source_id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(CaptureError::Http)?
            .error_for_status()
            .map_err(CaptureError::Http)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.starts_with("image/") {
            return Err(CaptureError::NotAnImage(content_type));
        }

        let bytes = response.bytes().await.map_err(CaptureError::Http)?;
        Ok(FetchedFrame {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Capture request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source returned a non-image content type: {0:?}")]
    NotAnImage(String),
}
