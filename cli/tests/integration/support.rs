//! Shared helpers: the binary under test and a fake image service.

#![allow(clippy::expect_used)]

use std::net::{Ipv4Addr, TcpListener as StdTcpListener};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use cloudimg_common::Tokens;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// The `cloudimg` binary with colors off and no ambient overrides.
pub fn cloudimg() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cloudimg"));
    cmd.env("NO_COLOR", "1")
        .env_remove("CLOUDIMG_API_URL")
        .env_remove("CLOUDIMG_LOG")
        .env_remove("CLOUDIMG_YES");
    cmd
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    listener.local_addr().expect("addr").port()
}

pub fn session_tokens(expires_in_hours: i64) -> Tokens {
    Tokens {
        login_token: "login-token".to_string(),
        session_id: "session-1".to_string(),
        keep_alive_token: "keep-alive".to_string(),
        expires_at: Utc::now() + ChronoDuration::hours(expires_in_hours),
    }
}

/// Write a credentials file the way `cloudimg login` does.
pub fn write_credentials(path: &Path, tokens: &Tokens) {
    std::fs::write(path, serde_json::to_string(tokens).expect("serialize")).expect("write");
}

// ── Fake image service ────────────────────────────────────────────────────────

/// Counters and captured headers of the fake service.
#[derive(Default)]
pub struct FakeState {
    /// Task-status requests answered with 503 before the task reports.
    pub task_failures: AtomicUsize,
    pub task_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    /// `(authorization, x-session-id)` of every image-list request.
    pub seen_auth: Mutex<Vec<(Option<String>, Option<String>)>>,
    /// Raw request paths of every image state transition.
    pub transition_paths: Mutex<Vec<String>>,
}

pub struct FakeApi {
    pub base_url: String,
    pub state: Arc<FakeState>,
    server: JoinHandle<()>,
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeApi {
    pub async fn spawn(state: FakeState) -> Self {
        let state = Arc::new(state);
        let router = Router::new()
            .route("/v1/oauth/url", get(oauth_url))
            .route("/v1/oauth/token", post(oauth_token))
            .route("/v1/images", get(list_images))
            .route("/v1/tasks/{task_id}", get(task_status))
            .route("/v1/images/{image_id}/activate", post(transition))
            .route("/v1/images/{image_id}/deactivate", post(transition))
            .with_state(Arc::clone(&state));
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind fake api");
        let port = listener.local_addr().expect("addr").port();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            state,
            server,
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn oauth_url(Query(params): Query<std::collections::HashMap<String, String>>) -> Response {
    let port = params.get("localhostPort").cloned().unwrap_or_default();
    Json(json!({
        "invocationUrl": format!("https://idp.example/authorize?redirect_uri=http://localhost:{port}/callback"),
        "alternativePorts": "51152,53152",
    }))
    .into_response()
}

async fn oauth_token(State(state): State<Arc<FakeState>>) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "code": "INVALID_AUTH_CODE", "message": "authorization code expired" })),
    )
        .into_response()
}

async fn list_images(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let auth = header(&headers, "authorization");
    let session = header(&headers, "x-session-id");
    state
        .seen_auth
        .lock()
        .expect("lock")
        .push((auth.clone(), session));
    if auth.as_deref() != Some("Bearer login-token") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": "UNAUTHENTICATED", "message": "missing token" })),
        )
            .into_response();
    }
    Json(json!({
        "images": [
            { "id": "img-1", "name": "base", "status": "RESOURCE_PUBLISHED" },
            { "id": "img-2", "name": "edge", "status": "IMAGE_AVAILABLE" },
        ]
    }))
    .into_response()
}

async fn task_status(
    State(state): State<Arc<FakeState>>,
    UrlPath(task_id): UrlPath<String>,
) -> Response {
    let call = state.task_calls.fetch_add(1, Ordering::SeqCst);
    if call < state.task_failures.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "try later").into_response();
    }
    Json(json!({ "taskId": task_id, "status": "Finished", "resultId": "img-9" })).into_response()
}

async fn transition(State(state): State<Arc<FakeState>>, uri: Uri) -> StatusCode {
    state
        .transition_paths
        .lock()
        .expect("lock")
        .push(uri.path().to_string());
    StatusCode::ACCEPTED
}
