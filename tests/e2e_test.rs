//! End-to-end pipeline tests against live Redis and PostgreSQL, with the
//! classifier, visual matcher, and order service stubbed by in-process HTTP
//! servers on ephemeral ports.
//!
//! Run with: cargo test --test e2e_test -- --ignored

use axum::{routing::post, Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use streamcart::{
    app_state::AppState,
    config::AppConfig,
    db::{self, queries},
    models::comment::Comment,
    models::intent::IntentLabel,
    services::{
        capture::CaptureClient, correlator, intent::IntentClient, orders::OrderClient,
        queue::CommentQueue, storage::FrameStore, vision::VisionClient,
    },
};

/// Serve a stub collaborator on an ephemeral port; returns its base URL.
async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub listener");
    let addr = listener.local_addr().expect("Stub has no local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub server failed");
    });
    format!("http://{addr}")
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

async fn build_state(
    config: &AppConfig,
    intent_url: &str,
    vision_url: &str,
    order_url: &str,
) -> AppState {
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    let queue = CommentQueue::new(&config.redis_url).expect("Failed to initialize queue");
    let frames = FrameStore::new(
        &config.frames_bucket,
        &config.frames_endpoint,
        &config.frames_access_key,
        &config.frames_secret_key,
        &config.frames_public_url,
    )
    .expect("Failed to initialize frame storage");

    // The collector does not run in these tests; its client can be inert.
    let dead = "http://127.0.0.1:1";
    let intent = IntentClient::new(intent_url).expect("intent client");
    let vision = VisionClient::new(vision_url).expect("vision client");
    let orders = OrderClient::new(order_url).expect("order client");
    let capture = CaptureClient::new(dead, dead).expect("capture client");

    AppState::new(
        db_pool,
        queue,
        frames,
        intent,
        vision,
        orders,
        capture,
        config.buy_threshold,
        config.match_threshold,
    )
}

#[tokio::test]
#[ignore] // Requires running Redis and PostgreSQL
async fn test_e2e_buy_intent_resolves_to_priced_order() {
    let config = AppConfig::from_env().expect("Failed to load config");

    let item_id = Uuid::new_v4();

    // Confident buy intent for two units.
    let classifier = Router::new().route(
        "/classify",
        post(|| async {
            Json(json!({ "label": "buy", "confidence": 0.9, "quantity": 2 }))
        }),
    );
    // Matcher resolves the frame to our catalog item above the 0.7 gate.
    let matcher = Router::new().route(
        "/match_product",
        post(move |Json(body): Json<Value>| async move {
            assert!(
                body["frame_locators"].as_array().is_some_and(|l| !l.is_empty()),
                "Matcher must receive at least one frame locator"
            );
            Json(json!({ "item_id": item_id, "confidence": 0.85 }))
        }),
    );
    let order_service = Router::new().route(
        "/orders",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["quantity"], 2);
            Json(json!({ "order_id": "ord-e2e-1", "status": "created" }))
        }),
    );

    let intent_url = spawn_stub(classifier).await;
    let vision_url = spawn_stub(matcher).await;
    let order_url = spawn_stub(order_service).await;

    let state = build_state(&config, &intent_url, &vision_url, &order_url).await;

    sqlx::query(
        "INSERT INTO catalog_items (id, name, unit_price, description) VALUES ($1, $2, $3, $4)",
    )
    .bind(item_id)
    .bind("Denim Jacket")
    .bind(50.0_f64)
    .bind("Blue denim jacket, size M")
    .execute(&state.db)
    .await
    .expect("Failed to seed catalog item");

    let source = unique("src");
    let recipient = unique("rcpt");

    // A frame captured shortly before the comment anchors the visual match.
    let captured_at = Utc::now() - ChronoDuration::seconds(5);
    queries::insert_frame(
        &state.db,
        &source,
        captured_at,
        "frames/e2e.jpg",
        "http://frames.local/e2e.jpg",
    )
    .await
    .expect("Failed to seed frame");

    let comment = Comment {
        source_id: source.clone(),
        recipient_id: recipient.clone(),
        timestamp: Utc::now(),
        text: "I want to buy two of these!".to_string(),
    };
    let (_, key) = state.queue.publish(&comment).await.expect("Publish failed");

    let outcome = correlator::process_batch(&state, &key, None)
        .await
        .expect("Pipeline failed");

    assert_eq!(outcome.resolved_intent, IntentLabel::Buy);
    assert!(outcome.payment_ready);

    let item = outcome.matched_item.expect("Expected a matched item");
    assert_eq!(item.id, item_id);
    assert_eq!(item.name, "Denim Jacket");
    assert_eq!(item.quantity, 2);
    assert_eq!(item.total, 100.0);

    assert!(outcome.reply.contains("Denim Jacket"));

    // Drain once, decide once: the queue is emptied by processing.
    assert_eq!(state.queue.len(&key).await.expect("llen failed"), 0);
}

#[tokio::test]
#[ignore] // Requires running Redis and PostgreSQL
async fn test_e2e_low_match_confidence_yields_no_purchase() {
    let config = AppConfig::from_env().expect("Failed to load config");

    let classifier = Router::new().route(
        "/classify",
        post(|| async { Json(json!({ "label": "buy", "confidence": 0.9, "quantity": 1 })) }),
    );
    // Below the match threshold: the pipeline must not price or order.
    let matcher = Router::new().route(
        "/match_product",
        post(|| async {
            Json(json!({ "item_id": Uuid::new_v4(), "confidence": 0.3 }))
        }),
    );
    let order_called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let order_called_flag = order_called.clone();
    let order_service = Router::new().route(
        "/orders",
        post(move || async move {
            order_called_flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Json(json!({ "order_id": "ord-unexpected", "status": "created" }))
        }),
    );

    let intent_url = spawn_stub(classifier).await;
    let vision_url = spawn_stub(matcher).await;
    let order_url = spawn_stub(order_service).await;

    let state = build_state(&config, &intent_url, &vision_url, &order_url).await;

    let source = unique("src");
    queries::insert_frame(
        &state.db,
        &source,
        Utc::now() - ChronoDuration::seconds(5),
        "frames/e2e-low.jpg",
        "http://frames.local/e2e-low.jpg",
    )
    .await
    .expect("Failed to seed frame");

    let comment = Comment {
        source_id: source.clone(),
        recipient_id: unique("rcpt"),
        timestamp: Utc::now(),
        text: "buy buy buy".to_string(),
    };
    let (_, key) = state.queue.publish(&comment).await.expect("Publish failed");

    let outcome = correlator::process_batch(&state, &key, None)
        .await
        .expect("Pipeline failed");

    assert_eq!(outcome.resolved_intent, IntentLabel::Buy);
    assert!(!outcome.payment_ready);
    assert!(outcome.matched_item.is_none());
    assert!(
        !order_called.load(std::sync::atomic::Ordering::SeqCst),
        "Order service must not be called when the match is rejected"
    );
    assert_eq!(state.queue.len(&key).await.expect("llen failed"), 0);
}
