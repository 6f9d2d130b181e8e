use streamcart::{
    app_state::AppState,
    config::AppConfig,
    db,
    models::comment::Comment,
    services::{
        capture::CaptureClient, collector, correlator, intent::IntentClient, orders::OrderClient,
        queue::CommentQueue, storage::FrameStore, vision::VisionClient,
    },
};

use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

/// Sleep when discovery finds no queues at all.
const IDLE_SLEEP_MS: u64 = 1000;

/// Backoff after an unhandled cycle error.
const ERROR_BACKOFF_MS: u64 = 1000;

/// Brief pause after a blocking wait times out, before re-discovery.
const TIMEOUT_SLEEP_MS: u64 = 100;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting streamcart worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Initialize services
    tracing::info!("Initializing services");
    let queue = CommentQueue::new(&config.redis_url).expect("Failed to initialize comment queue");

    let frames = FrameStore::new(
        &config.frames_bucket,
        &config.frames_endpoint,
        &config.frames_access_key,
        &config.frames_secret_key,
        &config.frames_public_url,
    )
    .expect("Failed to initialize frame storage");

    let intent =
        IntentClient::new(&config.intent_service_url).expect("Failed to initialize intent client");
    let vision =
        VisionClient::new(&config.vision_service_url).expect("Failed to initialize vision client");
    let orders =
        OrderClient::new(&config.order_service_url).expect("Failed to initialize order client");
    let capture = CaptureClient::new(&config.directory_service_url, &config.capture_service_url)
        .expect("Failed to initialize capture client");

    let state = AppState::new(
        db_pool,
        queue,
        frames,
        intent,
        vision,
        orders,
        capture,
        config.buy_threshold,
        config.match_threshold,
    );

    // The frame collector runs for the process lifetime alongside the queue
    // worker; the two coordinate only through the shared stores.
    let collector_state = state.clone();
    let capture_interval = Duration::from_secs(config.capture_interval_secs);
    tokio::spawn(async move {
        collector::run(collector_state, capture_interval).await;
    });

    tracing::info!("Worker ready, starting queue consumption loop");

    // DISCOVER → WAIT → [TIMEOUT | MESSAGE → PROCESS] → DISCOVER, forever.
    // A failed cycle is logged and backed off; the loop never terminates.
    loop {
        match run_cycle(&state).await {
            Ok(CycleOutcome::NoQueues) => {
                tracing::trace!("No active queues, sleeping");
                sleep(Duration::from_millis(IDLE_SLEEP_MS)).await;
            }
            Ok(CycleOutcome::TimedOut) => {
                sleep(Duration::from_millis(TIMEOUT_SLEEP_MS)).await;
            }
            Ok(CycleOutcome::Processed) => {
                tracing::debug!("Batch processed, re-discovering queues");
            }
            Err(e) => {
                tracing::error!(error = %e, "Worker cycle failed, backing off");
                sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
            }
        }
    }
}

enum CycleOutcome {
    /// Discovery returned no queues.
    NoQueues,
    /// Queues exist but the blocking wait produced nothing.
    TimedOut,
    /// One batch went through the pipeline.
    Processed,
}

/// One pass of the worker state machine: discover the current queue set,
/// block on all of it, and drive whatever arrives through the pipeline.
async fn run_cycle(state: &AppState) -> Result<CycleOutcome, Box<dyn std::error::Error>> {
    let keys = state.queue.list_active_queues().await;
    if keys.is_empty() {
        return Ok(CycleOutcome::NoQueues);
    }

    metrics::gauge!("active_queues").set(keys.len() as f64);
    tracing::debug!(queues = keys.len(), "Waiting on discovered queue set");

    let Some((key, payload)) = state.queue.wait_for_message(&keys).await? else {
        return Ok(CycleOutcome::TimedOut);
    };

    tracing::info!(
        queue_key = %key,
        source = %key.source_id,
        recipient = %key.recipient_id,
        "Message received, draining recipient queue"
    );

    // The popped message heads the batch; a malformed payload is dropped and
    // the rest of the queue is still drained.
    let head = match serde_json::from_str::<Comment>(&payload) {
        Ok(comment) => Some(comment),
        Err(e) => {
            tracing::error!(queue_key = %key, error = %e, "Invalid JSON in popped entry, dropping");
            None
        }
    };

    let outcome = correlator::process_batch(state, &key, head).await?;

    tracing::info!(
        queue_key = %key,
        messages = outcome.messages_consumed,
        intent = %outcome.resolved_intent,
        payment_ready = outcome.payment_ready,
        "Batch complete"
    );

    Ok(CycleOutcome::Processed)
}
