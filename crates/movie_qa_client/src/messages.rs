//! JSON bodies exchanged with the backend's `/api/auth/*` endpoints, and the
//! role vocabulary they carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role as issued by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_ADMIN", alias = "ADMIN")]
    Admin,
    #[default]
    #[serde(rename = "ROLE_USER", alias = "USER")]
    User,
    #[serde(rename = "ROLE_DEVELOPER", alias = "DEVELOPER")]
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::User => "ROLE_USER",
            Role::Developer => "ROLE_DEVELOPER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.strip_prefix("ROLE_").unwrap_or(trimmed) {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            "DEVELOPER" => Ok(Role::Developer),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Client → server: `POST /api/auth/login` body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Server → client: login reply. Both fields are optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl LoginResponse {
    /// The token, if present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Server → client: `GET /api/auth/me` reply. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub role: Role,
    #[serde(default)]
    pub username: Option<String>,
}
