use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::comment::{Comment, IncomingComment, SubmitResponse};
use crate::services::queue::LogEntry;

/// POST /api/v1/comments — accept a live-stream comment into the global log
/// and the recipient's queue.
pub async fn submit_comment(
    State(state): State<AppState>,
    Json(payload): Json<IncomingComment>,
) -> Result<Json<SubmitResponse>, (StatusCode, String)> {
    payload
        .validate()
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let comment = Comment::from_incoming(payload);

    let (log_position, key) = match state.queue.publish(&comment).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Failed to queue comment");
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Queue store unavailable".to_string(),
            ));
        }
    };

    metrics::counter!("comments_queued_total").increment(1);
    tracing::info!(
        queue_key = %key,
        log_position = %log_position,
        "Comment queued"
    );

    // Best-effort durable copy; the request already succeeded.
    if let Err(e) = queries::archive_comment(&state.db, &comment).await {
        tracing::warn!(queue_key = %key, error = %e, "Failed to archive comment, continuing");
    }

    Ok(Json(SubmitResponse {
        accepted: true,
        queue_key: key.redis_key(),
        log_position,
        timestamp: comment.timestamp,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_log_limit")]
    pub limit: usize,
}

fn default_log_limit() -> usize {
    100
}

/// GET /api/v1/comments/log — bounded read over the global audit log,
/// oldest first.
pub async fn read_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<LogEntry>>, (StatusCode, String)> {
    let limit = query.limit.min(1000);
    match state.queue.read_log(limit).await {
        Ok(entries) => Ok(Json(entries)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read comment log");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Queue store unavailable".to_string(),
            ))
        }
    }
}
