use std::sync::Arc;

use crate::backend::{Backend, HttpBackend};
use crate::client::ApiClient;
use crate::config::ConsoleConfig;
use crate::content::ContentStore;
use crate::error::ConsoleResult;
use crate::session::SessionStore;
use crate::storage::{FileStore, KeyValueStore};

/// One console session: the stores, constructed explicitly at startup.
pub struct Console {
    pub session: Arc<SessionStore>,
    pub content: ContentStore,
}

impl Console {
    pub fn new(backend: Arc<dyn Backend>, storage: Arc<dyn KeyValueStore>) -> Self {
        let session = Arc::new(SessionStore::new(backend.clone(), storage));
        let content = ContentStore::new(backend, session.clone());
        Self { session, content }
    }

    /// HTTP backend at the configured base URL, token kept on disk.
    pub fn from_config(cfg: &ConsoleConfig) -> Self {
        let backend = HttpBackend::new(ApiClient::new(cfg.api_base_url.clone()));
        let storage = FileStore::open(cfg.storage_path());
        Self::new(Arc::new(backend), Arc::new(storage))
    }

    /// Ends the session and drops everything cached for it.
    pub fn logout(&self) -> ConsoleResult<()> {
        self.session.logout()?;
        self.content.reset();
        Ok(())
    }
}
