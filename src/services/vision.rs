use reqwest::Client;
use std::time::Duration;

use crate::models::intent::VisualMatch;

/// Client for the external visual product matcher.
pub struct VisionClient {
    http: Client,
    base_url: String,
}

impl VisionClient {
    pub fn new(base_url: &str) -> Result<Self, VisionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(VisionError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the matcher to resolve the given frame locators to a catalog item.
    /// Callers degrade any error to `VisualMatch::none()`.
    pub async fn match_product(
        &self,
        frame_locators: &[String],
        source_id: &str,
    ) -> Result<VisualMatch, VisionError> {
        let url = format!("{}/match_product", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "frame_locators": frame_locators,
                "source_id": source_id,
            }))
            .send()
            .await
            .map_err(VisionError::Http)?
            .error_for_status()
            .map_err(VisionError::Http)?;

        response.json().await.map_err(VisionError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Visual matcher request failed: {0}")]
    Http(#[from] reqwest::Error),
}
