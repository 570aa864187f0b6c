//! HTTP handlers for presence updates and vote commands.

use crate::messages;
use crate::middleware::IdentityContext;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tribunal_types::{SessionSummary, VoteEvent};
use tribunal_vote::VoteError;
use uuid::Uuid;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<VoteError> for ApiError {
    fn from(e: VoteError) -> Self {
        let message = e.to_string();
        match e {
            VoteError::NotInRoom => ApiError::Forbidden(message),
            VoteError::InvalidTarget | VoteError::DifferentRooms => ApiError::BadRequest(message),
            VoteError::NoActiveVote => ApiError::NotFound(message),
            VoteError::VoteAlreadyActive(_) | VoteError::AlreadyVoted => {
                ApiError::Conflict(message)
            }
        }
    }
}

/// Request body for `POST /api/presence`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub participant_id: String,
    /// `null` or absent when the participant left voice.
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Response body for `POST /api/presence`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub participant_id: String,
    pub room_id: Option<String>,
    pub previous_room_id: Option<String>,
}

/// Request body for `POST /api/votes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVoteRequest {
    pub target_id: String,
}

/// Response body for `POST /api/votes`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVoteResponse {
    pub session_id: Uuid,
    pub room_id: String,
    pub target_id: String,
    pub votes_needed: u32,
    pub deadline: DateTime<Utc>,
    pub message: String,
}

/// Request body for `POST /api/votes/cast`.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    #[serde(alias = "vote")]
    pub affirmative: bool,
}

/// Response body for `POST /api/votes/cast`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteResponse {
    pub session_id: Uuid,
    pub room_id: String,
    pub votes_for: u32,
    pub votes_needed: u32,
    pub message: String,
}

/// Handler for `POST /api/presence`.
///
/// Entry point of the presence feed. Always overwrites the participant's
/// current room.
pub async fn presence_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PresenceUpdate>,
) -> Result<Json<PresenceResponse>, ApiError> {
    let participant_id = payload.participant_id.trim().to_string();
    if participant_id.is_empty() {
        return Err(ApiError::BadRequest("participantId is required".to_string()));
    }

    let previous_room_id = state
        .coordinator
        .record_presence(&participant_id, payload.room_id.as_deref());
    let room_id = state.coordinator.tracker().room_of(&participant_id);

    Ok(Json(PresenceResponse {
        participant_id,
        room_id,
        previous_room_id,
    }))
}

/// Handler for `POST /api/votes`.
pub async fn start_vote_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(IdentityContext(initiator)): Extension<IdentityContext>,
    Json(payload): Json<StartVoteRequest>,
) -> Result<Json<StartVoteResponse>, ApiError> {
    let summary = state
        .coordinator
        .start_vote(&initiator, &payload.target_id)
        .map_err(|e| {
            tracing::info!(initiator = %initiator, target = %payload.target_id, "vote start rejected: {}", e);
            ApiError::from(e)
        })?;

    state.emit(VoteEvent::Started {
        session_id: summary.session_id,
        room_id: summary.room_id.clone(),
        target_id: summary.target_id.clone(),
        initiator_id: summary.initiator_id.clone(),
        votes_needed: summary.votes_needed,
        deadline: summary.deadline,
    });

    let message = messages::vote_started(
        &summary.target_id,
        state.coordinator.policy().duration_seconds,
        summary.votes_needed,
    );

    Ok(Json(StartVoteResponse {
        session_id: summary.session_id,
        room_id: summary.room_id,
        target_id: summary.target_id,
        votes_needed: summary.votes_needed,
        deadline: summary.deadline,
        message,
    }))
}

/// Handler for `POST /api/votes/cast`.
///
/// On success the running tally is posted to the room without waiting
/// for the platform. `VoteRecorded` is broadcast before any early
/// resolution starts.
pub async fn cast_vote_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(IdentityContext(voter)): Extension<IdentityContext>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<Json<CastVoteResponse>, ApiError> {
    let receipt = state
        .coordinator
        .cast_vote_then(&voter, payload.affirmative, |receipt| {
            state.emit(VoteEvent::VoteRecorded {
                session_id: receipt.session_id,
                room_id: receipt.room_id.clone(),
                votes_for: receipt.tally.votes_for,
                votes_needed: receipt.tally.votes_needed,
                voter_count: receipt.tally.voter_count,
            });
        })
        .map_err(|e| {
            tracing::info!(voter = %voter, "vote rejected: {}", e);
            ApiError::from(e)
        })?;

    let sink = state.sink.clone();
    let room_id = receipt.room_id.clone();
    let status = messages::vote_status(receipt.tally.votes_for, receipt.tally.votes_needed);
    tokio::spawn(async move {
        if let Err(e) = sink.post(&room_id, &status).await {
            tracing::warn!(room_id = %room_id, error = %e, "failed to send vote status message");
        }
    });

    Ok(Json(CastVoteResponse {
        session_id: receipt.session_id,
        room_id: receipt.room_id,
        votes_for: receipt.tally.votes_for,
        votes_needed: receipt.tally.votes_needed,
        message: messages::vote_counted().to_string(),
    }))
}

/// Handler for `GET /api/rooms/{roomId}/vote`.
pub async fn get_room_vote_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    state
        .coordinator
        .active_vote(&room_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no active vote in room {}", room_id)))
}
