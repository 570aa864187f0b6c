//! SSE vote event stream handlers.

use crate::AppState;
use axum::{
    extract::{Extension, Query},
    response::{sse::Event, Sse},
};
use futures_util::Stream;
use serde::Deserialize;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Query parameters for `GET /events/votes`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStreamQuery {
    /// Only forward events for this room.
    pub room_id: Option<String>,
}

/// Handler for `GET /events/votes`.
///
/// Streams vote lifecycle events (started, vote recorded, resolved, cancelled).
pub async fn get_vote_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<VoteStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx);
    let room_filter = query.room_id;

    let mapped_stream = stream.filter_map(move |result| match result {
        Ok(event) => {
            if let Some(room) = room_filter.as_deref() {
                if event.room_id() != room {
                    return None;
                }
            }
            match serde_json::to_string(&event) {
                Ok(data) => Some(Ok(Event::default().event(event_name(&event)).data(data))),
                Err(e) => {
                    tracing::error!("failed to serialize vote event: {}", e);
                    None
                }
            }
        }
        Err(broadcast_error) => {
            tracing::warn!(
                error = %broadcast_error,
                "vote SSE stream lagged; events were dropped for this subscriber"
            );
            None
        }
    });

    Sse::new(mapped_stream).keep_alive(axum::response::sse::KeepAlive::default())
}

fn event_name(event: &tribunal_types::VoteEvent) -> &'static str {
    use tribunal_types::VoteEvent;
    match event {
        VoteEvent::Started { .. } => "started",
        VoteEvent::VoteRecorded { .. } => "vote_recorded",
        VoteEvent::Resolved { .. } => "resolved",
        VoteEvent::Cancelled { .. } => "cancelled",
    }
}
