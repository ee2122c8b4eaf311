//! Session gate: establishes, validates, persists and tears down the
//! authenticated session.
//!
//! The gate is the only owner of the session. It is built from a [`Client`]
//! and a [`TokenStore`] and shared by reference (usually behind an `Arc`);
//! nothing else reads or writes the persisted token.

use reqwest::StatusCode;
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{Client, ClientError};
use crate::messages::Role;
use crate::store::TokenStore;

/// Client-held authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub role: Role,
    pub logged_in: bool,
}

impl Session {
    /// Logged out, `Role::User`, no token.
    pub fn anonymous() -> Self {
        Self::default()
    }

    fn authenticated(token: String, role: Role) -> Self {
        Self {
            token: Some(token),
            role,
            logged_in: true,
        }
    }
}

/// Whether the session may ingest documents into the knowledge base.
pub fn can_upload_documents(session: &Session) -> bool {
    session.logged_in && session.role == Role::Admin
}

/// Login form input. Lives only as long as the form holding it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must be non-empty after trimming.
    pub fn validate(&self) -> Result<(), LoginError> {
        if self.username.trim().is_empty() || self.password.trim().is_empty() {
            return Err(LoginError::Validation);
        }
        Ok(())
    }

    pub fn clear_password(&mut self) {
        self.password.clear();
    }
}

/// Why a login attempt failed. `Display` is the text shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Please enter both username and password.")]
    Validation,
    #[error("{}", rejected_message(.status, .body))]
    Rejected { status: StatusCode, body: String },
    #[error("{}", transport_message(.0))]
    Transport(String),
    #[error("Login failed: the server did not issue a token")]
    MissingToken,
    #[error("Login failed: unexpected response from server")]
    Decode(String),
}

fn rejected_message(status: &StatusCode, body: &str) -> String {
    if body.is_empty() {
        format!("Login failed ({})", status.as_u16())
    } else {
        body.to_string()
    }
}

fn transport_message(message: &str) -> String {
    if message.trim().is_empty() {
        "Login failed".to_string()
    } else {
        message.to_string()
    }
}

impl From<ClientError> for LoginError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Status { status, body } => LoginError::Rejected { status, body },
            ClientError::Transport(e) => LoginError::Transport(e.to_string()),
            ClientError::Decode(e) => LoginError::Decode(e.to_string()),
            ClientError::File(e) => LoginError::Transport(e.to_string()),
        }
    }
}

pub struct SessionGate {
    client: Client,
    store: Arc<dyn TokenStore>,
    session: RwLock<Session>,
}

impl SessionGate {
    /// New gate in the anonymous state. Call [`SessionGate::restore`] to pick
    /// up a persisted token.
    pub fn new(client: Client, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            store,
            session: RwLock::new(Session::anonymous()),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bearer token for protected calls, if signed in.
    pub fn bearer(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    fn replace(&self, next: Session) -> Session {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next.clone();
        next
    }

    /// Pick up the persisted token and validate it against `/api/auth/me`.
    ///
    /// Never fails: a missing token means no network call, and any validation
    /// failure deletes the token and leaves the session anonymous.
    pub async fn restore(&self) -> Session {
        let token = match self.store.get() {
            Ok(Some(t)) => t,
            Ok(None) => return self.replace(Session::anonymous()),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read persisted token");
                return self.replace(Session::anonymous());
            }
        };

        match self.client.me(&token).await {
            Ok(identity) => {
                tracing::info!(role = %identity.role, "session restored");
                self.replace(Session::authenticated(token, identity.role))
            }
            Err(e) => {
                tracing::debug!(error = %e, "persisted token rejected, signing out");
                self.forget_token();
                self.replace(Session::anonymous())
            }
        }
    }

    /// Exchange credentials for a token, persist it and adopt the issued role.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, LoginError> {
        credentials.validate()?;

        let reply = self
            .client
            .login(&credentials.username, &credentials.password)
            .await?;
        let token = reply.token().ok_or(LoginError::MissingToken)?.to_string();

        let current_role = self.session().role;
        let role = match reply.role.as_deref() {
            Some(raw) => raw.parse::<Role>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring role from login reply");
                current_role
            }),
            None => current_role,
        };

        if let Err(e) = self.store.set(&token) {
            tracing::warn!(error = %e, "cannot persist token; session lasts until exit");
        }
        tracing::info!(%role, "logged in");
        Ok(self.replace(Session::authenticated(token, role)))
    }

    /// Delete the persisted token and return to the anonymous session.
    pub fn sign_out(&self) -> Session {
        self.forget_token();
        tracing::info!("signed out");
        self.replace(Session::anonymous())
    }

    fn forget_token(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "cannot delete persisted token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_credentials_are_invalid() {
        assert!(Credentials::new("  ", "pw").validate().is_err());
        assert!(Credentials::new("alice", "\t").validate().is_err());
        assert!(Credentials::new(" alice ", "pw").validate().is_ok());
    }

    #[test]
    fn only_signed_in_admins_can_upload() {
        let mut s = Session::anonymous();
        assert!(!can_upload_documents(&s));
        s.role = Role::Admin;
        assert!(!can_upload_documents(&s));
        s.logged_in = true;
        assert!(can_upload_documents(&s));
        s.role = Role::Developer;
        assert!(!can_upload_documents(&s));
    }

    #[test]
    fn rejected_login_uses_body_or_status_code() {
        let with_body = LoginError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            body: "Bad credentials".into(),
        };
        assert_eq!(with_body.to_string(), "Bad credentials");
        let empty = LoginError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert_eq!(empty.to_string(), "Login failed (401)");
        let blank = LoginError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            body: "\n".into(),
        };
        assert_eq!(blank.to_string(), "\n");
    }
}
