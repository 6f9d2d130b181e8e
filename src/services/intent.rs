use reqwest::Client;
use std::time::Duration;

use crate::models::intent::IntentResult;

/// Client for the external buying-intent classifier.
pub struct IntentClient {
    http: Client,
    base_url: String,
}

impl IntentClient {
    pub fn new(base_url: &str) -> Result<Self, IntentError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(IntentError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Classify one batch of comment text. Callers degrade any error to
    /// `IntentResult::none()`; this method only reports what happened.
    pub async fn classify(&self, text: &str) -> Result<IntentResult, IntentError> {
        let url = format!("{}/classify", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(IntentError::Http)?
            .error_for_status()
            .map_err(IntentError::Http)?;

        response.json().await.map_err(IntentError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("Intent classifier request failed: {0}")]
    Http(#[from] reqwest::Error),
}
