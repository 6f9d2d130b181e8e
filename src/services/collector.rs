use chrono::Utc;
use std::time::Duration;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::frame::CapturedFrame;
use crate::services::capture::CaptureError;
use crate::services::storage::{FrameStore, StorageError};

/// Frame-collector loop: every interval, capture one representative frame
/// per active source and record it for later correlation. Runs for the
/// process lifetime alongside the queue worker; per-source failures never
/// abort the cycle, directory failures degrade to an empty source list.
pub async fn run(state: AppState, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Frame collector started");

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let sources = match state.capture.active_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!(error = %e, "Directory service unavailable, skipping capture cycle");
                Vec::new()
            }
        };

        for source in &sources {
            match capture_one(&state, source).await {
                Ok(frame) => {
                    metrics::counter!("frames_captured_total").increment(1);
                    tracing::debug!(
                        source = %source,
                        frame_id = %frame.id,
                        storage_key = %frame.storage_key,
                        "Frame captured"
                    );
                }
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Frame capture failed");
                }
            }
        }
    }
}

/// Capture, upload, and record one frame for one source.
async fn capture_one(state: &AppState, source_id: &str) -> Result<CapturedFrame, CollectorError> {
    let fetched = state.capture.fetch_frame(source_id).await?;

    // The source already claimed an image content type; make sure the bytes
    // actually decode as one before they land in storage.
    image::guess_format(&fetched.bytes)?;

    let captured_at = Utc::now();
    let storage_key = FrameStore::frame_key(source_id, captured_at);
    let locator = state
        .frames
        .upload_frame(&storage_key, &fetched.bytes, &fetched.content_type)
        .await?;

    let record =
        queries::insert_frame(&state.db, source_id, captured_at, &storage_key, &locator).await?;

    Ok(record)
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Captured bytes are not a recognizable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Frame upload failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Frame record insert failed: {0}")]
    Db(#[from] sqlx::Error),
}
