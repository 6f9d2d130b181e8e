use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One captured live-stream frame: append-only record written by the frame
/// collector, read-only for the correlator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub id: Uuid,
    pub source_id: String,
    pub captured_at: DateTime<Utc>,
    /// Object-storage key the raw bytes were uploaded under.
    pub storage_key: String,
    /// Publicly resolvable URL handed to the visual matcher.
    pub locator: String,
}
