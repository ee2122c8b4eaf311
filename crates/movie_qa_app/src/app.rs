//! The application: one session gate shared by every panel.

use movie_qa_client::{can_upload_documents, Client, Session, SessionGate, TokenStore};
use std::sync::Arc;

use crate::panels::{ChatPanel, LoginForm, RagPanel, UploadPanel};

pub struct App {
    gate: Arc<SessionGate>,
    pub login: LoginForm,
    pub chat: ChatPanel,
    pub rag: RagPanel,
    upload: UploadPanel,
}

impl App {
    pub fn new(client: Client, store: Arc<dyn TokenStore>) -> Self {
        let gate = Arc::new(SessionGate::new(client.clone(), store));
        Self {
            login: LoginForm::new(gate.clone()),
            chat: ChatPanel::new(gate.clone()),
            rag: RagPanel::new(client),
            upload: UploadPanel::new(gate.clone()),
            gate,
        }
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    /// Restore the persisted session. Run once at start-up.
    pub async fn start(&self) -> Session {
        self.gate.restore().await
    }

    pub fn session(&self) -> Session {
        self.gate.session()
    }

    pub fn can_upload(&self) -> bool {
        can_upload_documents(&self.gate.session())
    }

    /// The upload panel, for sessions allowed to ingest documents.
    pub fn upload_panel(&self) -> Option<&UploadPanel> {
        self.can_upload().then_some(&self.upload)
    }

    /// Sign out and reset every panel.
    pub fn sign_out(&self) -> Session {
        let session = self.gate.sign_out();
        self.login.reset();
        self.chat.reset();
        self.rag.clear();
        self.upload.reset();
        session
    }
}
