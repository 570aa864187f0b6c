//! Tribunal server library logic.

pub mod api;
pub mod api_sse;
pub mod background;
pub mod config;
pub mod messages;
pub mod middleware;
pub mod outbound;
pub mod resolution;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use outbound::{MessagingSink, ModerationAction};
use resolution::ResolutionExecutor;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tribunal_types::{VoteEvent, VotePolicy};
use tribunal_vote::{SessionScheduler, VoiceRoomTracker, VoteCoordinator, VoteSessionRegistry};

/// Capacity of the vote event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Tracker, registry and scheduler behind the vote commands.
    pub coordinator: VoteCoordinator,
    /// Broadcast channel for vote lifecycle events.
    pub events_tx: broadcast::Sender<VoteEvent>,
    /// Room message sink, also used by the resolution executor.
    pub sink: Arc<dyn MessagingSink>,
}

impl AppState {
    /// Wires a fresh tracker, registry, scheduler and resolution executor.
    ///
    /// Nothing is shared with other `AppState` instances, so tests can
    /// build one per case.
    pub fn new(
        policy: VotePolicy,
        sink: Arc<dyn MessagingSink>,
        moderation: Arc<dyn ModerationAction>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let tracker = VoiceRoomTracker::new();
        let registry = VoteSessionRegistry::new();
        let executor = ResolutionExecutor::new(
            registry.clone(),
            sink.clone(),
            moderation,
            events_tx.clone(),
            policy.timeout(),
        );
        let scheduler = SessionScheduler::new(registry.clone(), Arc::new(executor));
        let coordinator = VoteCoordinator::new(tracker, registry, scheduler, policy);

        Self {
            coordinator,
            events_tx,
            sink,
        }
    }

    /// Broadcasts a vote event. Having no subscribers is not an error.
    pub fn emit(&self, event: VoteEvent) {
        if self.events_tx.send(event).is_err() {
            tracing::trace!("no vote event subscribers");
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/votes", post(api::start_vote_handler))
        .route("/api/votes/cast", post(api::cast_vote_handler))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/api/presence", post(api::presence_handler))
        .route("/api/rooms/{roomId}/vote", get(api::get_room_vote_handler))
        .route("/events/votes", get(api_sse::get_vote_stream_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
