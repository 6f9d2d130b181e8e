use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::models::outcome::PipelineOutcome;
use crate::services::correlator;
use crate::services::queue::QueueKey;

/// Request to drain and decide one recipient's queue on demand.
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessQueueRequest {
    #[garde(length(min = 1, max = 255))]
    pub source_id: String,

    #[garde(length(min = 1, max = 255))]
    pub recipient_id: String,
}

/// POST /api/v1/queues/process — on-demand entry point into the correlator.
/// An empty queue is a no-op outcome, not an error.
pub async fn process_queue(
    State(state): State<AppState>,
    Json(payload): Json<ProcessQueueRequest>,
) -> Result<Json<PipelineOutcome>, (StatusCode, String)> {
    payload
        .validate()
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let key = QueueKey::new(&payload.source_id, &payload.recipient_id);

    match correlator::process_batch(&state, &key, None).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::error!(queue_key = %key, error = %e, "Queue processing failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Queue store unavailable".to_string(),
            ))
        }
    }
}
