//! Front-end panels: login form, chat, knowledge-base (RAG) query and PDF
//! upload. Each panel owns a [`RequestSlot`] and turns backend replies into
//! the message the user sees.

use movie_qa_client::{Client, Credentials, LoginError, Session, SessionGate, UploadFile};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::state::{Outcome, RequestSlot};

pub const EMPTY_QUESTION: &str = "Please enter a question.";
pub const CHAT_PLACEHOLDER: &str = "Your answer will appear here.";
pub const CHAT_UNAVAILABLE: &str = "Could not fetch the answer. Is the backend running?";
pub const NO_FILE_SELECTED: &str = "Please choose a PDF file first.";
pub const UPLOAD_DEFAULT_SUCCESS: &str = "PDF ingested successfully!";
const UNKNOWN_ERROR: &str = "Unknown error";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn error_text(e: &impl std::fmt::Display) -> String {
    let text = e.to_string();
    if text.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        text
    }
}

// ── Login ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LoginForm {
    gate: Arc<SessionGate>,
    credentials: Arc<Mutex<Credentials>>,
    slot: RequestSlot,
}

impl LoginForm {
    pub fn new(gate: Arc<SessionGate>) -> Self {
        Self {
            gate,
            credentials: Arc::default(),
            slot: RequestSlot::new(),
        }
    }

    pub fn set_username(&self, username: &str) {
        lock(&self.credentials).username = username.to_string();
    }

    pub fn set_password(&self, password: &str) {
        lock(&self.credentials).password = password.to_string();
    }

    pub fn username(&self) -> String {
        lock(&self.credentials).username.clone()
    }

    pub fn has_password(&self) -> bool {
        !lock(&self.credentials).password.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.slot.is_loading()
    }

    /// Inline error under the form, if any.
    pub fn error(&self) -> Option<String> {
        self.slot.outcome().map(|o| o.message().to_string())
    }

    /// Submit the entered credentials. On success the password and any
    /// error are cleared; on failure the error is shown inline.
    pub async fn submit(&self) -> Result<Session, LoginError> {
        let credentials = lock(&self.credentials).clone();
        if let Err(e) = credentials.validate() {
            self.slot.settle_local(Outcome::Prompt(e.to_string()));
            return Err(e);
        }

        let pending = self.slot.begin();
        match self.gate.login(&credentials).await {
            Ok(session) => {
                lock(&self.credentials).clear_password();
                pending.clear();
                Ok(session)
            }
            Err(e) => {
                tracing::debug!(error = %e, "login failed");
                pending.settle(Outcome::Failure(e.to_string()));
                Err(e)
            }
        }
    }

    /// Forget everything entered, as when the form is torn down.
    pub fn reset(&self) {
        *lock(&self.credentials) = Credentials::default();
        self.slot.reset();
    }
}

// ── Chat ────────────────────────────────────────────────────────────────

/// General chat backed by the LLM; requires a signed-in session.
#[derive(Clone)]
pub struct ChatPanel {
    gate: Arc<SessionGate>,
    slot: RequestSlot,
}

impl ChatPanel {
    pub fn new(gate: Arc<SessionGate>) -> Self {
        Self {
            gate,
            slot: RequestSlot::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.slot.is_loading()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.slot.outcome()
    }

    /// The answer box: the last answer or the placeholder.
    pub fn answer_text(&self) -> String {
        match self.slot.outcome() {
            Some(Outcome::Success(answer)) if !answer.is_empty() => answer,
            _ => CHAT_PLACEHOLDER.to_string(),
        }
    }

    /// Inline error or prompt, if any.
    pub fn error(&self) -> Option<String> {
        match self.slot.outcome() {
            Some(Outcome::Prompt(m)) | Some(Outcome::Failure(m)) => Some(m),
            _ => None,
        }
    }

    /// Ask the chat endpoint. Returns `None` when there is no session token:
    /// the request is skipped without any message.
    pub async fn ask(&self, question: &str) -> Option<Outcome> {
        let question = question.trim();
        if question.is_empty() {
            return Some(self.slot.settle_local(Outcome::Prompt(EMPTY_QUESTION.into())));
        }
        let Some(token) = self.gate.bearer() else {
            tracing::info!("chat skipped: not signed in");
            self.slot.reset();
            return None;
        };

        let pending = self.slot.begin();
        let outcome = match self.gate.client().chat_ask(&token, question).await {
            Ok(answer) => Outcome::Success(answer),
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                Outcome::Failure(CHAT_UNAVAILABLE.into())
            }
        };
        Some(pending.settle(outcome).1)
    }

    pub fn reset(&self) {
        self.slot.reset();
    }
}

// ── Knowledge base ──────────────────────────────────────────────────────

/// Questions answered from the ingested documents. No session needed.
#[derive(Clone)]
pub struct RagPanel {
    client: Client,
    slot: RequestSlot,
}

impl RagPanel {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            slot: RequestSlot::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.slot.is_loading()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.slot.outcome()
    }

    /// Query the knowledge base. The question is sent as entered; only the
    /// emptiness check trims it.
    pub async fn ask(&self, question: &str) -> Outcome {
        if question.trim().is_empty() {
            return self.slot.settle_local(Outcome::Prompt(EMPTY_QUESTION.into()));
        }

        let pending = self.slot.begin();
        let outcome = match self.client.rag_ask(question).await {
            Ok(reply) if reply.is_success() => Outcome::Success(reply.body),
            Ok(reply) => Outcome::Failure(format!("Query failed: {}", reply.body_or_status_text())),
            Err(e) => {
                tracing::warn!(error = %e, "knowledge base query failed");
                Outcome::Failure(format!("Query error: {}", error_text(&e)))
            }
        };
        pending.settle(outcome).1
    }

    /// Drop the shown answer.
    pub fn clear(&self) {
        self.slot.reset();
    }
}

// ── Upload ──────────────────────────────────────────────────────────────

/// PDF ingestion into the knowledge base.
#[derive(Clone)]
pub struct UploadPanel {
    gate: Arc<SessionGate>,
    selected: Arc<Mutex<Option<UploadFile>>>,
    slot: RequestSlot,
}

impl UploadPanel {
    pub fn new(gate: Arc<SessionGate>) -> Self {
        Self {
            gate,
            selected: Arc::default(),
            slot: RequestSlot::new(),
        }
    }

    pub fn select(&self, file: UploadFile) {
        *lock(&self.selected) = Some(file);
    }

    pub fn select_path(&self, path: &Path) -> Result<(), movie_qa_client::ClientError> {
        self.select(UploadFile::from_path(path)?);
        Ok(())
    }

    pub fn deselect(&self) {
        *lock(&self.selected) = None;
    }

    pub fn selected_file_name(&self) -> Option<String> {
        lock(&self.selected).as_ref().map(|f| f.file_name.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.slot.is_loading()
    }

    /// Upload is possible only with a file selected and nothing in flight.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && lock(&self.selected).is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.slot.outcome()
    }

    /// Send the selected file. On success the selection is cleared; on any
    /// failure it is kept so the user can retry.
    pub async fn upload(&self) -> Outcome {
        let Some(file) = lock(&self.selected).clone() else {
            return self.slot.settle_local(Outcome::Prompt(NO_FILE_SELECTED.into()));
        };

        let pending = self.slot.begin();
        let token = self.gate.bearer();
        let outcome = match self.gate.client().upload(token.as_deref(), &file).await {
            Ok(reply) if reply.is_success() => {
                let message = if reply.body.is_empty() {
                    UPLOAD_DEFAULT_SUCCESS.to_string()
                } else {
                    reply.body
                };
                Outcome::Success(message)
            }
            Ok(reply) => Outcome::Failure(format!("Upload failed: {}", reply.body_or_status_text())),
            Err(e) => {
                tracing::warn!(error = %e, file = %file.file_name, "upload failed");
                Outcome::Failure(format!("Upload error: {}", error_text(&e)))
            }
        };

        let (published, outcome) = pending.settle(outcome);
        if published && outcome.is_success() {
            let mut selected = lock(&self.selected);
            if selected.as_ref() == Some(&file) {
                *selected = None;
            }
        }
        outcome
    }

    pub fn reset(&self) {
        self.deselect();
        self.slot.reset();
    }
}
