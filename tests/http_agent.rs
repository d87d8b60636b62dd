//! End-to-end session flow over real HTTP against an in-process server

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use drawer_agent::actuator::{Actuator, DrawerController, Level, Polarity, SimulatedPins};
use drawer_agent::delay::TokioDelay;
use drawer_agent::session::{PollOutcome, ReportStatus, SessionAgent, SessionConfig};
use drawer_agent::transport::HttpTransport;
use drawer_shared::state_machine::SessionState;
use drawer_shared::CommandOutcome;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Default)]
struct ServerState {
    /// Token handed out by the next successful auth
    tokens: VecDeque<String>,
    /// Token the server currently accepts
    valid_token: Option<String>,
    /// Command bodies served by next-command, in order
    commands: VecDeque<Value>,
    confirmed: Vec<String>,
    failed: Vec<(String, String)>,
    polls: u32,
}

type Shared = Arc<Mutex<ServerState>>;

fn bearer_ok(state: &ServerState, headers: &HeaderMap) -> bool {
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    matches!((presented, state.valid_token.as_deref()), (Some(p), Some(v)) if p == v)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn auth(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if body["device_id"] != "dev-int" || body["secret"] != "secret123" {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match state.tokens.pop_front() {
        Some(token) => {
            state.valid_token = Some(token.clone());
            Json(json!({ "token": token })).into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn next_command(
    State(state): State<Shared>,
    Path(device): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state.polls += 1;
    if device != "dev-int" {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !bearer_ok(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match state.commands.pop_front() {
        Some(command) => Json(command).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn execute(
    State(state): State<Shared>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    if !bearer_ok(&state, &headers) {
        return StatusCode::FORBIDDEN;
    }
    if state.confirmed.contains(&code) {
        return StatusCode::CONFLICT;
    }
    state.confirmed.push(code);
    StatusCode::OK
}

async fn fail(
    State(state): State<Shared>,
    Path(code): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    if !bearer_ok(&state, &headers) {
        return StatusCode::FORBIDDEN;
    }
    match drawer_shared::codec::decode_failure(&body) {
        Ok(message) => {
            state.failed.push((code, message));
            StatusCode::OK
        }
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

async fn spawn_server(state: Shared) -> Url {
    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/device", post(auth))
        .route("/devices/:device/next-command", get(next_command))
        .route("/commands/:code/execute", post(execute))
        .route("/commands/:code/fail", post(fail))
        .with_state(state);
    let app = Router::new().nest("/api/v1", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("no addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    Url::parse(&format!("http://{}/api/v1", addr)).expect("bad url")
}

struct Rig {
    agent: SessionAgent<HttpTransport, DrawerController>,
    drawers: Arc<DrawerController>,
    pins: Arc<SimulatedPins>,
    server: Shared,
}

async fn rig(tokens: &[&str], commands: Vec<Value>) -> Rig {
    let server = Arc::new(Mutex::new(ServerState {
        tokens: tokens.iter().map(|t| t.to_string()).collect(),
        commands: commands.into_iter().collect(),
        ..Default::default()
    }));
    let base = spawn_server(server.clone()).await;

    let pins = Arc::new(SimulatedPins::new());
    let delay = Arc::new(TokioDelay);
    let drawers = Arc::new(
        DrawerController::new(
            vec![32, 33, 26, 27],
            pins.clone(),
            delay.clone(),
            Polarity::ActiveLow,
            Duration::from_millis(5),
        )
        .expect("drawer setup failed"),
    );

    let transport = HttpTransport::new(&base, Duration::from_secs(5)).expect("client");
    let config = SessionConfig {
        device_id: "dev-int".into(),
        secret: "secret123".into(),
        health_attempts: 3,
        health_interval: Duration::from_millis(10),
    };
    let agent = SessionAgent::new(config, transport, drawers.clone(), delay);

    Rig {
        agent,
        drawers,
        pins,
        server,
    }
}

#[tokio::test]
async fn test_open_command_round_trip() {
    let mut rig = rig(
        &["tok-1"],
        vec![json!({"action": "open", "drawer": 2, "code": "I-2"})],
    )
    .await;

    assert!(rig.agent.check_reachability().await);
    assert!(rig.agent.authenticate().await);
    assert_eq!(rig.agent.credential(), Some("tok-1"));

    let result = rig.agent.poll_for_command().await;
    assert_eq!(
        result,
        PollOutcome::Dispatched {
            outcome: CommandOutcome::success("I-2"),
            report: ReportStatus::Delivered,
        }
    );
    assert_eq!(rig.server.lock().unwrap().confirmed, vec!["I-2".to_string()]);

    // Relay back at rest after the pulse
    let pin = rig.drawers.pin_for(2).expect("no pin");
    assert_eq!(rig.pins.level(pin), Some(Level::High));

    assert_eq!(rig.agent.poll_for_command().await, PollOutcome::NoCommand);

    // Reporting again is an anomaly, not a reason to actuate
    assert_eq!(
        rig.agent
            .report_outcome(&CommandOutcome::success("I-2"))
            .await,
        ReportStatus::AlreadyProcessed
    );
}

#[tokio::test]
async fn test_invalid_drawer_reports_failure() {
    let mut rig = rig(
        &["tok-1"],
        vec![json!({"action": "open", "drawer": 9, "code": "I-9"})],
    )
    .await;
    assert!(rig.agent.authenticate().await);

    let result = rig.agent.poll_for_command().await;
    assert!(matches!(
        result,
        PollOutcome::Dispatched {
            report: ReportStatus::Delivered,
            ..
        }
    ));

    let failed = rig.server.lock().unwrap().failed.clone();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "I-9");
    assert!(failed[0].1.contains("[1, 4]"), "{}", failed[0].1);
    assert_eq!(rig.drawers.drawer_count(), 4);
}

#[tokio::test]
async fn test_quoted_failure_message_reaches_server_intact() {
    let mut rig = rig(&["tok-1"], vec![]).await;
    assert!(rig.agent.authenticate().await);

    let message = r#"relay "3" reported {"fault": true}"#;
    let status = rig
        .agent
        .report_outcome(&CommandOutcome::failure("Q-1", message))
        .await;
    assert_eq!(status, ReportStatus::Delivered);

    let failed = rig.server.lock().unwrap().failed.clone();
    assert_eq!(failed, vec![("Q-1".to_string(), message.to_string())]);
}

#[tokio::test]
async fn test_expired_credential_requires_reauthentication() {
    let mut rig = rig(
        &["tok-1", "tok-2"],
        vec![json!({"action": "close", "drawer": 1, "code": "C-1"})],
    )
    .await;
    assert!(rig.agent.authenticate().await);

    // Server rotates credentials behind the agent's back
    rig.server.lock().unwrap().valid_token = Some("revoked".into());

    assert_eq!(rig.agent.poll_for_command().await, PollOutcome::CredentialExpired);
    assert_eq!(rig.agent.state(), SessionState::Unauthenticated);

    let polls = rig.server.lock().unwrap().polls;
    assert_eq!(rig.agent.poll_for_command().await, PollOutcome::Skipped);
    assert_eq!(rig.server.lock().unwrap().polls, polls);

    assert!(rig.agent.authenticate().await);
    assert_eq!(rig.agent.credential(), Some("tok-2"));

    let result = rig.agent.poll_for_command().await;
    assert_eq!(
        result,
        PollOutcome::Dispatched {
            outcome: CommandOutcome::failure("C-1", "action not implemented: close"),
            report: ReportStatus::Delivered,
        }
    );
}

#[tokio::test]
async fn test_unreachable_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("no addr");
    drop(listener);

    let base = Url::parse(&format!("http://{}/api/v1", addr)).expect("bad url");
    let transport = HttpTransport::new(&base, Duration::from_millis(500)).expect("client");
    let pins = Arc::new(SimulatedPins::new());
    let delay = Arc::new(TokioDelay);
    let drawers = Arc::new(
        DrawerController::new(vec![1], pins, delay.clone(), Polarity::ActiveLow, Duration::ZERO)
            .expect("drawer setup failed"),
    );
    let config = SessionConfig {
        device_id: "dev-int".into(),
        secret: "secret123".into(),
        health_attempts: 2,
        health_interval: Duration::from_millis(10),
    };
    let mut agent = SessionAgent::new(config, transport, drawers, delay);

    assert!(!agent.check_reachability().await);
    assert!(!agent.authenticate().await);
    assert_eq!(agent.poll_for_command().await, PollOutcome::Skipped);
}

/// Read one request (head plus `Content-Length` body) off a raw socket
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    use tokio::io::AsyncReadExt;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n");
        if let Some(end) = head_end {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return String::from_utf8_lossy(&buf[..end]).to_string();
            }
        }
        let n = stream.read(&mut chunk).await.expect("read failed");
        if n == 0 {
            return String::from_utf8_lossy(&buf).to_string();
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Server that authenticates normally but cuts every other body short
async fn spawn_truncating_server() -> Url {
    use tokio::io::AsyncWriteExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("no addr");
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let head = read_request(&mut stream).await;
            let response = if head.contains("/auth/device") {
                let body = r#"{"token":"tok-1"}"#;
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
            } else {
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\nConnection: close\r\n\r\n{\"action\":\"open\",\"dr".to_string()
            };
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    Url::parse(&format!("http://{}/api/v1", addr)).expect("bad url")
}

#[tokio::test]
async fn test_truncated_command_body_is_a_transport_error() {
    let base = spawn_truncating_server().await;
    let transport = HttpTransport::new(&base, Duration::from_secs(5)).expect("client");
    let pins = Arc::new(SimulatedPins::new());
    let delay = Arc::new(TokioDelay);
    let drawers = Arc::new(
        DrawerController::new(vec![1], pins, delay.clone(), Polarity::ActiveLow, Duration::ZERO)
            .expect("drawer setup failed"),
    );
    let config = SessionConfig {
        device_id: "dev-int".into(),
        secret: "secret123".into(),
        health_attempts: 1,
        health_interval: Duration::from_millis(10),
    };
    let mut agent = SessionAgent::new(config, transport, drawers, delay);

    assert!(agent.authenticate().await);
    assert_eq!(agent.poll_for_command().await, PollOutcome::TransportError);
    assert!(agent.is_authenticated());
}
