//! In-process fake of the movie Q&A backend, served by axum on a random port.
//! Records every request so tests can assert on what reached the network.
#![allow(dead_code)]

use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";
/// Token issued by a successful `alice` login; an admin token.
pub const LOGIN_TOKEN: &str = "abc";

/// One request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub bearer: Option<String>,
    pub query: Option<String>,
}

/// One received upload.
#[derive(Debug, Clone)]
pub struct Received {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

#[derive(Default)]
pub struct Backend {
    hits: Mutex<Vec<Hit>>,
    uploads: Mutex<Vec<Received>>,
    /// Slow requests (question `"slow"`, user `"slowpoke"`, file
    /// `"slow.pdf"`) wait here until notified.
    pub gate: Notify,
}

impl Backend {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hits_on(&self, path: &str) -> usize {
        self.hits().iter().filter(|h| h.path == path).count()
    }

    pub fn total_hits(&self) -> usize {
        self.hits().len()
    }

    pub fn uploads(&self) -> Vec<Received> {
        self.uploads.lock().unwrap().clone()
    }

    fn record(&self, path: &str, headers: &HeaderMap, query: Option<String>) {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        self.hits.lock().unwrap().push(Hit {
            path: path.to_string(),
            bearer,
            query,
        });
    }

    fn bearer(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

pub struct TestBackend {
    pub base_url: String,
    pub state: Arc<Backend>,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl TestBackend {
    /// Stop listening and close every open connection. Later requests to
    /// `base_url` fail at the transport level.
    pub async fn shut_down(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
    }
}

/// Start the fake backend on `127.0.0.1:0`.
pub async fn spawn_backend() -> TestBackend {
    let state = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/login", post(login))
        .route("/api/chat/ask", get(chat_ask))
        .route("/api/rag/ask", get(rag_ask))
        .route("/api/rag/upload", post(upload))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    TestBackend {
        base_url: format!("http://127.0.0.1:{}", port),
        state,
        shutdown: Some(tx),
        server: Some(server),
    }
}

/// A URL where nothing is listening.
pub fn dead_url() -> String {
    let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = l.local_addr().unwrap().port();
    drop(l);
    format!("http://127.0.0.1:{}", port)
}

async fn me(State(s): State<Arc<Backend>>, headers: HeaderMap) -> (StatusCode, String) {
    s.record("/api/auth/me", &headers, None);
    match Backend::bearer(&headers) {
        Some(ADMIN_TOKEN) | Some(LOGIN_TOKEN) => (
            StatusCode::OK,
            r#"{"username":"alice","role":"ROLE_ADMIN"}"#.into(),
        ),
        Some(USER_TOKEN) => (
            StatusCode::OK,
            r#"{"username":"bob","role":"ROLE_USER"}"#.into(),
        ),
        Some("garbled-token") => (StatusCode::OK, "not json".into()),
        _ => (StatusCode::UNAUTHORIZED, "Invalid token".into()),
    }
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(
    State(s): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<LoginBody>,
) -> (StatusCode, String) {
    s.record("/api/auth/login", &headers, None);
    match (body.username.as_str(), body.password.as_str()) {
        ("alice", "secret") => (
            StatusCode::OK,
            format!(r#"{{"token":"{}","role":"ROLE_ADMIN"}}"#, LOGIN_TOKEN),
        ),
        ("bob", "hunter2") => (
            StatusCode::OK,
            format!(r#"{{"token":"{}","role":"ROLE_USER"}}"#, USER_TOKEN),
        ),
        ("slowpoke", _) => {
            s.gate.notified().await;
            (
                StatusCode::OK,
                format!(r#"{{"token":"{}","role":"ROLE_USER"}}"#, USER_TOKEN),
            )
        }
        ("tokenless", _) => (StatusCode::OK, r#"{"role":"ROLE_USER"}"#.into()),
        ("mystery", _) => (StatusCode::OK, r#"{"token":"m-token","role":"ROLE_ROOT"}"#.into()),
        ("mute", _) => (StatusCode::UNAUTHORIZED, String::new()),
        _ => (StatusCode::UNAUTHORIZED, "Bad credentials".into()),
    }
}

#[derive(Deserialize)]
struct ChatQuery {
    question: String,
}

async fn chat_ask(
    State(s): State<Arc<Backend>>,
    headers: HeaderMap,
    Query(q): Query<ChatQuery>,
) -> (StatusCode, String) {
    s.record("/api/chat/ask", &headers, Some(q.question.clone()));
    match Backend::bearer(&headers) {
        Some(ADMIN_TOKEN) | Some(USER_TOKEN) | Some(LOGIN_TOKEN) => {}
        _ => return (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
    }
    match q.question.as_str() {
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, "model exploded".into()),
        "slow" => {
            s.gate.notified().await;
            (StatusCode::OK, "Slow answer".into())
        }
        other => (StatusCode::OK, format!("Answer to: {}", other)),
    }
}

#[derive(Deserialize)]
struct RagQuery {
    q: String,
}

async fn rag_ask(
    State(s): State<Arc<Backend>>,
    headers: HeaderMap,
    Query(q): Query<RagQuery>,
) -> (StatusCode, String) {
    s.record("/api/rag/ask", &headers, Some(q.q.clone()));
    match q.q.as_str() {
        "fail" => (StatusCode::SERVICE_UNAVAILABLE, String::new()),
        "bad" => (StatusCode::BAD_REQUEST, "Unknown collection".into()),
        "slow" => {
            s.gate.notified().await;
            (StatusCode::OK, "Slow RAG answer".into())
        }
        other => (StatusCode::OK, format!("RAG: {}", other)),
    }
}

async fn upload(
    State(s): State<Arc<Backend>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    s.record("/api/rag/upload", &headers, None);
    let mut received = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        received.push(Received {
            field: name,
            file_name,
            content_type,
            len,
        });
    }
    s.uploads.lock().unwrap().extend(received.iter().cloned());

    if !matches!(Backend::bearer(&headers), Some(ADMIN_TOKEN) | Some(LOGIN_TOKEN)) {
        return (StatusCode::FORBIDDEN, "Admins only".into());
    }
    let Some(doc) = received.iter().find(|r| r.field == "file") else {
        return (StatusCode::BAD_REQUEST, "missing file part".into());
    };
    if doc.file_name.as_deref() == Some("slow.pdf") {
        s.gate.notified().await;
    }
    match doc.file_name.as_deref() {
        Some("quiet.pdf") => (StatusCode::OK, String::new()),
        Some("broken.pdf") => (StatusCode::UNPROCESSABLE_ENTITY, "Not a PDF".into()),
        Some("teapot.pdf") => (StatusCode::IM_A_TEAPOT, String::new()),
        name => (
            StatusCode::OK,
            format!("Ingested {} ({} bytes)", name.unwrap_or("?"), doc.len),
        ),
    }
}
