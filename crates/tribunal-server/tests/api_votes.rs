use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use tribunal_server::outbound::{MessagingSink, ModerationAction, OutboundError};
use tribunal_server::{app, messages, AppState};
use tribunal_types::{VoteEvent, VotePolicy};

#[derive(Default)]
struct FakePlatform {
    messages: Mutex<Vec<(String, String)>>,
    timeouts: Mutex<Vec<(String, String, Duration)>>,
}

impl FakePlatform {
    fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    fn timeouts(&self) -> Vec<(String, String, Duration)> {
        self.timeouts.lock().unwrap().clone()
    }

    fn count_messages(&self, prefix: &str) -> usize {
        self.messages()
            .iter()
            .filter(|(_, text)| text.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl MessagingSink for FakePlatform {
    async fn post(&self, room_id: &str, text: &str) -> Result<(), OutboundError> {
        self.messages
            .lock()
            .unwrap()
            .push((room_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ModerationAction for FakePlatform {
    async fn timeout(
        &self,
        room_scope: &str,
        target_id: &str,
        duration: Duration,
    ) -> Result<(), OutboundError> {
        self.timeouts.lock().unwrap().push((
            room_scope.to_string(),
            target_id.to_string(),
            duration,
        ));
        Ok(())
    }
}

fn setup(policy: VotePolicy) -> (Router, AppState, Arc<FakePlatform>) {
    let platform = Arc::new(FakePlatform::default());
    let state = AppState::new(policy, platform.clone(), platform.clone());
    (app(state.clone()), state, platform)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    participant: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = participant {
        builder = builder.header("X-Participant-Id", id);
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn join(app: &Router, participant: &str, room: Option<&str>) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/presence",
        None,
        Some(json!({ "participantId": participant, "roomId": room })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn start(app: &Router, initiator: &str, target: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/votes",
        Some(initiator),
        Some(json!({ "targetId": target })),
    )
    .await
}

async fn cast(app: &Router, voter: &str, affirmative: bool) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/votes/cast",
        Some(voter),
        Some(json!({ "affirmative": affirmative })),
    )
    .await
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

async fn fill_room(app: &Router, room: &str, participants: &[&str]) {
    for p in participants {
        join(app, p, Some(room)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn passing_vote_times_out_target_once_and_frees_room() {
    let (app, state, platform) = setup(VotePolicy::default());
    fill_room(&app, "voice-1", &["alice", "bob", "carol", "mallory"]).await;

    let (status, body) = start(&app, "alice", "mallory").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votesNeeded"], 3);
    assert_eq!(body["roomId"], "voice-1");
    assert!(body["message"].as_str().unwrap().contains("60 seconds"));

    for (i, voter) in ["alice", "bob", "carol"].iter().enumerate() {
        let (status, body) = cast(&app, voter, true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["votesFor"], i as u64 + 1);
        assert_eq!(body["message"], messages::vote_counted());
    }

    let (status, body) = send(&app, "GET", "/api/rooms/voice-1/vote", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votesFor"], 3);
    assert_eq!(body["state"], "open");

    tokio::time::advance(Duration::from_secs(61)).await;
    let registry = state.coordinator.registry().clone();
    wait_until(|| registry.is_empty()).await;

    assert_eq!(
        platform.timeouts(),
        vec![(
            "voice-1".to_string(),
            "mallory".to_string(),
            Duration::from_secs(300)
        )]
    );
    assert_eq!(platform.count_messages("Vote passed."), 1);
    assert_eq!(platform.count_messages("Vote failed."), 0);

    let (status, _) = send(&app, "GET", "/api/rooms/voice-1/vote", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = start(&app, "bob", "carol").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn short_vote_fails_without_timeout() {
    let (app, state, platform) = setup(VotePolicy::default());
    fill_room(&app, "voice-1", &["alice", "bob", "carol", "mallory"]).await;

    assert_eq!(start(&app, "alice", "mallory").await.0, StatusCode::OK);
    assert_eq!(cast(&app, "alice", true).await.0, StatusCode::OK);
    assert_eq!(cast(&app, "bob", true).await.0, StatusCode::OK);
    assert_eq!(cast(&app, "carol", false).await.0, StatusCode::OK);

    tokio::time::advance(Duration::from_secs(61)).await;
    let registry = state.coordinator.registry().clone();
    wait_until(|| registry.is_empty()).await;

    assert!(platform.timeouts().is_empty());
    assert_eq!(platform.count_messages(messages::vote_failed()), 1);
    assert_eq!(platform.count_messages("Vote passed."), 0);
}

#[tokio::test(start_paused = true)]
async fn quorum_resolves_early_when_enabled() {
    let policy = VotePolicy {
        resolve_on_quorum: true,
        ..VotePolicy::default()
    };
    let (app, state, platform) = setup(policy);
    fill_room(&app, "voice-1", &["alice", "bob", "carol", "mallory"]).await;

    assert_eq!(start(&app, "alice", "mallory").await.0, StatusCode::OK);
    for voter in ["alice", "bob", "carol"] {
        assert_eq!(cast(&app, voter, true).await.0, StatusCode::OK);
    }

    let registry = state.coordinator.registry().clone();
    wait_until(|| registry.is_empty()).await;
    assert_eq!(platform.timeouts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn each_ballot_posts_running_tally() {
    let (app, _state, platform) = setup(VotePolicy::default());
    fill_room(&app, "voice-1", &["alice", "bob", "carol", "mallory"]).await;

    assert_eq!(start(&app, "alice", "mallory").await.0, StatusCode::OK);
    assert_eq!(cast(&app, "bob", true).await.0, StatusCode::OK);

    let expected = messages::vote_status(1, 3);
    let p = platform.clone();
    wait_until(move || p.count_messages(&expected) == 1).await;
    assert!(platform
        .messages()
        .iter()
        .all(|(room, _)| room == "voice-1"));
}

#[tokio::test(start_paused = true)]
async fn start_vote_rejections_map_to_statuses() {
    let (app, _state, _platform) = setup(VotePolicy::default());
    fill_room(&app, "voice-1", &["alice", "mallory"]).await;
    join(&app, "dave", Some("voice-2")).await;

    // No identity header.
    let (status, _) = send(
        &app,
        "POST",
        "/api/votes",
        None,
        Some(json!({ "targetId": "mallory" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = start(&app, "outsider", "mallory").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    assert_eq!(start(&app, "alice", "  ").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(start(&app, "alice", "dave").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(start(&app, "alice", "ghost").await.0, StatusCode::BAD_REQUEST);

    assert_eq!(start(&app, "alice", "mallory").await.0, StatusCode::OK);
    assert_eq!(start(&app, "mallory", "alice").await.0, StatusCode::CONFLICT);

    // A different room is independent.
    join(&app, "erin", Some("voice-2")).await;
    assert_eq!(start(&app, "dave", "erin").await.0, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn cast_vote_rejections_map_to_statuses() {
    let (app, _state, _platform) = setup(VotePolicy::default());
    fill_room(&app, "voice-1", &["alice", "bob", "mallory"]).await;

    assert_eq!(cast(&app, "alice", true).await.0, StatusCode::NOT_FOUND);
    assert_eq!(cast(&app, "outsider", true).await.0, StatusCode::FORBIDDEN);

    assert_eq!(start(&app, "alice", "mallory").await.0, StatusCode::OK);
    assert_eq!(cast(&app, "bob", false).await.0, StatusCode::OK);
    assert_eq!(cast(&app, "bob", true).await.0, StatusCode::CONFLICT);
}

#[tokio::test(start_paused = true)]
async fn presence_updates_report_previous_room() {
    let (app, _state, _platform) = setup(VotePolicy::default());

    let body = join(&app, "alice", Some("voice-1")).await;
    assert_eq!(body["roomId"], "voice-1");
    assert!(body["previousRoomId"].is_null());

    let body = join(&app, "alice", Some("voice-2")).await;
    assert_eq!(body["previousRoomId"], "voice-1");

    let body = join(&app, "alice", None).await;
    assert!(body["roomId"].is_null());
    assert_eq!(body["previousRoomId"], "voice-2");

    let (status, _) = send(
        &app,
        "POST",
        "/api/presence",
        None,
        Some(json!({ "participantId": " " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn threshold_ignores_later_arrivals() {
    let (app, state, platform) = setup(VotePolicy::default());
    fill_room(&app, "voice-1", &["alice", "bob", "mallory"]).await;

    // floor(3 * 0.75) = 2
    let (_, body) = start(&app, "alice", "mallory").await;
    assert_eq!(body["votesNeeded"], 2);

    fill_room(&app, "voice-1", &["carol", "dave", "erin"]).await;
    assert_eq!(cast(&app, "alice", true).await.0, StatusCode::OK);
    assert_eq!(cast(&app, "carol", true).await.0, StatusCode::OK);

    tokio::time::advance(Duration::from_secs(61)).await;
    let registry = state.coordinator.registry().clone();
    wait_until(|| registry.is_empty()).await;
    assert_eq!(platform.timeouts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deciding_ballot_is_broadcast_before_resolution() {
    let policy = VotePolicy {
        resolve_on_quorum: true,
        ..VotePolicy::default()
    };
    let (app, state, _platform) = setup(policy);
    let mut events = state.events_tx.subscribe();
    fill_room(&app, "voice-1", &["alice", "bob", "carol", "mallory"]).await;

    assert_eq!(start(&app, "alice", "mallory").await.0, StatusCode::OK);
    for voter in ["alice", "bob", "carol"] {
        assert_eq!(cast(&app, voter, true).await.0, StatusCode::OK);
    }

    let mut order = Vec::new();
    while order.len() < 5 {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event should arrive")
            .unwrap();
        order.push(match event {
            VoteEvent::Started { .. } => "started".to_string(),
            VoteEvent::VoteRecorded { votes_for, .. } => format!("recorded:{}", votes_for),
            VoteEvent::Resolved { .. } => "resolved".to_string(),
            VoteEvent::Cancelled { .. } => "cancelled".to_string(),
        });
    }
    assert_eq!(
        order,
        ["started", "recorded:1", "recorded:2", "recorded:3", "resolved"]
    );
}
