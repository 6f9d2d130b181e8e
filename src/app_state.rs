use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{
    capture::CaptureClient, intent::IntentClient, orders::OrderClient, queue::CommentQueue,
    storage::FrameStore, vision::VisionClient,
};

/// Shared application state passed to route handlers and both worker loops.
///
/// One client per external store/collaborator per process; the worker and the
/// collector coordinate only through these stores, never through in-memory
/// signaling.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<CommentQueue>,
    pub frames: Arc<FrameStore>,
    pub intent: Arc<IntentClient>,
    pub vision: Arc<VisionClient>,
    pub orders: Arc<OrderClient>,
    pub capture: Arc<CaptureClient>,
    pub buy_threshold: f64,
    pub match_threshold: f64,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: PgPool,
        queue: CommentQueue,
        frames: FrameStore,
        intent: IntentClient,
        vision: VisionClient,
        orders: OrderClient,
        capture: CaptureClient,
        buy_threshold: f64,
        match_threshold: f64,
    ) -> Self {
        Self {
            db,
            queue: Arc::new(queue),
            frames: Arc::new(frames),
            intent: Arc::new(intent),
            vision: Arc::new(vision),
            orders: Arc::new(orders),
            capture: Arc::new(capture),
            buy_threshold,
            match_threshold,
        }
    }
}
