mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{
    capture::CaptureClient, intent::IntentClient, orders::OrderClient, queue::CommentQueue,
    storage::FrameStore, vision::VisionClient,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing streamcart intake server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("comments_queued_total", "Total comments accepted into queues");
    metrics::describe_counter!("frames_captured_total", "Total frames captured and recorded");
    metrics::describe_counter!("orders_triggered_total", "Total orders triggered by the pipeline");
    metrics::describe_counter!("pipeline_batches_total", "Total drained batches processed");
    metrics::describe_histogram!(
        "pipeline_processing_seconds",
        "Time to process one drained batch through the pipeline"
    );
    metrics::describe_gauge!("active_queues", "Per-recipient queues seen by the last discovery");

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize Redis comment queues and global log
    tracing::info!("Connecting to Redis comment queues");
    let queue = CommentQueue::new(&config.redis_url).expect("Failed to initialize comment queue");

    // Initialize frame object storage
    tracing::info!("Initializing frame storage client");
    let frames = FrameStore::new(
        &config.frames_bucket,
        &config.frames_endpoint,
        &config.frames_access_key,
        &config.frames_secret_key,
        &config.frames_public_url,
    )
    .expect("Failed to initialize frame storage");

    // Initialize collaborator clients
    tracing::info!("Initializing collaborator clients");
    let intent =
        IntentClient::new(&config.intent_service_url).expect("Failed to initialize intent client");
    let vision =
        VisionClient::new(&config.vision_service_url).expect("Failed to initialize vision client");
    let orders =
        OrderClient::new(&config.order_service_url).expect("Failed to initialize order client");
    let capture = CaptureClient::new(&config.directory_service_url, &config.capture_service_url)
        .expect("Failed to initialize capture client");

    // Create shared application state
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

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/status", get(routes::health::service_status))
        .route("/api/v1/comments", post(routes::comments::submit_comment))
        .route("/api/v1/comments/log", get(routes::comments::read_log))
        .route("/api/v1/queues/process", post(routes::process::process_queue))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // comments are small

    tracing::info!("Starting streamcart on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
