//! services/client/src/shell/state.rs
//!
//! Defines the application's shared state and the state of one shell.

use std::sync::Arc;

use folio_core::ports::LocalStore;
use folio_core::{CatalogStore, ReaderState, ReadingController, SessionContext, SessionManager};

use crate::adapters::{ApiClient, HttpCatalogService, HttpIdentityService, HttpProgressSink};
use crate::config::Config;
use crate::error::ClientError;

//=========================================================================================
// AppState (Shared Across the Process)
//=========================================================================================

/// The wired-up core, created once at startup.
pub struct AppState {
    pub sessions: SessionManager,
    pub catalog: Arc<CatalogStore>,
    pub reader: ReadingController,
}

impl AppState {
    /// Wires every port to its HTTP adapter, all sharing one session context.
    pub fn build(config: &Config, store: Arc<dyn LocalStore>) -> Result<Self, ClientError> {
        let context = SessionContext::new(store);
        let client = ApiClient::new(config.api_url.clone(), config.request_timeout, context.clone())?;

        let identity = Arc::new(HttpIdentityService::new(client.clone()));
        let catalog = Arc::new(CatalogStore::new(
            Arc::new(HttpCatalogService::new(client.clone())),
            context.clone(),
        ));
        let progress = Arc::new(HttpProgressSink::new(client));

        let sessions = SessionManager::new(context.clone(), identity, config.session_settings());
        let reader = ReadingController::new(context, catalog.clone(), progress, config.reader_settings());

        Ok(Self {
            sessions,
            catalog,
            reader,
        })
    }

    pub fn context(&self) -> &SessionContext {
        self.sessions.context()
    }
}

//=========================================================================================
// ShellState (Specific to One Terminal)
//=========================================================================================

/// What the terminal currently shows.
#[derive(Debug, Default)]
pub struct ShellState {
    pub reader: ReaderState,
}

impl ShellState {
    /// Tears down any open reading session.
    pub fn close_reader(&mut self) -> bool {
        match std::mem::take(&mut self.reader) {
            ReaderState::Ready(session) => {
                session.close();
                true
            }
            _ => false,
        }
    }
}
