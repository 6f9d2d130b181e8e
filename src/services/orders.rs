use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Attribution channel stamped on every order this pipeline triggers.
const ORDER_CHANNEL: &str = "live_stream";

/// Client for the external order service.
pub struct OrderClient {
    http: Client,
    base_url: String,
}

/// Receipt returned by the order service.
#[derive(Debug, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub status: String,
}

impl OrderClient {
    pub fn new(base_url: &str) -> Result<Self, OrderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(OrderError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Trigger order creation for a matched item. At-most-once per drained
    /// batch: failure is logged by the caller, never retried here.
    pub async fn create_order(
        &self,
        item_id: Uuid,
        buyer_id: &str,
        source_id: &str,
        quantity: u32,
    ) -> Result<OrderReceipt, OrderError> {
        let url = format!("{}/orders", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "item_id": item_id,
                "buyer_id": buyer_id,
                "source_id": source_id,
                "channel": ORDER_CHANNEL,
                "quantity": quantity,
            }))
            .send()
            .await
            .map_err(OrderError::Http)?
            .error_for_status()
            .map_err(OrderError::Http)?;

        response.json().await.map_err(OrderError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order service request failed: {0}")]
    Http(#[from] reqwest::Error),
}
