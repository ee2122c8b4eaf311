//! Movie Q&A client library: config, backend HTTP calls, token persistence
//! and the session gate. Used by the `movie_qa_app` front end.

pub mod client;
pub mod config;
pub mod messages;
pub mod session;
pub mod store;

pub use client::{Client, ClientError, TextReply, UploadFile};
pub use config::{default_config_path, ApiSection, Config, ConfigError, SessionSection};
pub use messages::{Identity, LoginResponse, Role};
pub use session::{can_upload_documents, Credentials, LoginError, Session, SessionGate};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
