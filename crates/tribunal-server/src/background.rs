//! Background tasks for the tribunal server.
//!
//! Includes:
//! - Posting the startup announcement.

use crate::messages;
use crate::outbound::MessagingSink;
use std::sync::Arc;

/// Posts the startup announcement to `room_id`.
///
/// Runs once at boot. A failure is logged and otherwise ignored; the
/// server keeps serving.
pub async fn announce_startup(sink: Arc<dyn MessagingSink>, room_id: String) {
    match sink.post(&room_id, messages::startup()).await {
        Ok(()) => tracing::info!(room_id = %room_id, "posted startup announcement"),
        Err(e) => tracing::error!(room_id = %room_id, error = %e, "failed to post startup announcement"),
    }
}
