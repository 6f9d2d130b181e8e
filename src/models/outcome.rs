use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::intent::IntentLabel;

/// Catalog item resolved for a drained batch, priced and ready for payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedItem {
    pub id: Uuid,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub total: f64,
}

/// Outcome of draining one recipient's queue through the pipeline.
///
/// Transient: produced per batch, returned to the caller (or logged by the
/// worker), never persisted by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub source_id: String,
    pub recipient_id: String,
    pub messages_consumed: usize,
    pub resolved_intent: IntentLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_item: Option<MatchedItem>,
    pub payment_ready: bool,
    pub reply: String,
}

impl PipelineOutcome {
    /// Outcome for a queue that had nothing to process.
    pub fn empty(source_id: &str, recipient_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            recipient_id: recipient_id.to_string(),
            messages_consumed: 0,
            resolved_intent: IntentLabel::None,
            matched_item: None,
            payment_ready: false,
            reply: "There are no messages in the queue to process.".to_string(),
        }
    }
}
