//! HTTP client for the movie Q&A backend: identity check, login, chat, RAG
//! query and PDF upload.

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use std::path::Path;
use std::time::Duration;

use crate::messages::{Identity, LoginRequest, LoginResponse};

pub const ME_PATH: &str = "/api/auth/me";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const CHAT_ASK_PATH: &str = "/api/chat/ask";
pub const RAG_ASK_PATH: &str = "/api/rag/ask";
pub const RAG_UPLOAD_PATH: &str = "/api/rag/upload";

/// Multipart field the backend reads the uploaded document from.
pub const UPLOAD_FIELD: &str = "file";

/// Client error. Only `Status` carries an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Server returned {status}")]
    Status { status: StatusCode, body: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot read file: {0}")]
    File(#[from] std::io::Error),
}

/// Status and raw text body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
    pub status: StatusCode,
    pub body: String,
}

impl TextReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Reason phrase for the status (`"Not Found"`), or the numeric code.
    pub fn status_text(&self) -> String {
        self.status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| self.status.as_str().to_string())
    }

    /// Body if non-empty, otherwise the status text.
    pub fn body_or_status_text(&self) -> String {
        if self.body.is_empty() {
            self.status_text()
        } else {
            self.body.clone()
        }
    }

    async fn read(res: Response) -> Result<Self, ClientError> {
        let status = res.status();
        let body = res.text().await?;
        Ok(Self { status, body })
    }
}

/// A document picked for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a file from disk; the file name becomes the multipart file name.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let is_pdf = Path::new(file_name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if is_pdf {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

/// Backend client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Client for `base_url` (e.g. `http://localhost:8080`), no request timeout.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/auth/me`: validate `token` and return the caller's identity.
    pub async fn me(&self, token: &str) -> Result<Identity, ClientError> {
        tracing::debug!(path = ME_PATH, "checking identity");
        let res = self.http.get(self.url(ME_PATH)).bearer_auth(token).send().await?;
        let reply = TextReply::read(res).await?;
        if !reply.is_success() {
            return Err(ClientError::Status {
                status: reply.status,
                body: reply.body,
            });
        }
        Ok(serde_json::from_str(&reply.body)?)
    }

    /// `POST /api/auth/login` with a JSON `{username, password}` body.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        tracing::debug!(path = LOGIN_PATH, username, "logging in");
        let res = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let reply = TextReply::read(res).await?;
        if !reply.is_success() {
            return Err(ClientError::Status {
                status: reply.status,
                body: reply.body,
            });
        }
        Ok(serde_json::from_str(&reply.body)?)
    }

    /// `GET /api/chat/ask?question=..` with a bearer token. Non-2xx is an error.
    pub async fn chat_ask(&self, token: &str, question: &str) -> Result<String, ClientError> {
        tracing::debug!(path = CHAT_ASK_PATH, "asking chat");
        let res = self
            .http
            .get(self.url(CHAT_ASK_PATH))
            .query(&[("question", question)])
            .bearer_auth(token)
            .send()
            .await?;
        let reply = TextReply::read(res).await?;
        if !reply.is_success() {
            return Err(ClientError::Status {
                status: reply.status,
                body: reply.body,
            });
        }
        Ok(reply.body)
    }

    /// `GET /api/rag/ask?q=..`, unauthenticated. Any status is returned as a reply.
    pub async fn rag_ask(&self, question: &str) -> Result<TextReply, ClientError> {
        tracing::debug!(path = RAG_ASK_PATH, "querying knowledge base");
        let res = self
            .http
            .get(self.url(RAG_ASK_PATH))
            .query(&[("q", question)])
            .send()
            .await?;
        TextReply::read(res).await
    }

    /// `POST /api/rag/upload` as multipart with a single `file` field.
    /// The bearer token is attached when given. Any status is returned as a reply.
    pub async fn upload(
        &self,
        token: Option<&str>,
        file: &UploadFile,
    ) -> Result<TextReply, ClientError> {
        tracing::debug!(
            path = RAG_UPLOAD_PATH,
            file = %file.file_name,
            bytes = file.bytes.len(),
            "uploading document"
        );
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        let mut req = self.http.post(self.url(RAG_UPLOAD_PATH)).multipart(form);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        TextReply::read(req.send().await?).await
    }
}
