pub mod config;
pub mod controller;
pub mod error;
pub mod image;
pub mod message;
pub mod models;
pub mod parser;
pub mod sessions;
pub mod text;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::controller::ChatController;
use crate::sessions::{InMemorySessionStore, RestSessionStore, SessionStore};
use crate::transport::{ChatTransport, HttpChatTransport};

/// Wires the backend transport and session store from configuration and hands
/// out conversations that share them.
pub struct GreenieService {
    transport: Arc<dyn ChatTransport>,
    sessions: Arc<dyn SessionStore>,
    config: Config,
}

impl GreenieService {
    pub fn new(cfg: &Config) -> Self {
        let transport = Arc::new(HttpChatTransport::new(&cfg.backend.base_url));

        let sessions: Arc<dyn SessionStore> = match RestSessionStore::from_config(&cfg.sessions) {
            Some(store) => {
                tracing::info!("Using remote session store table '{}'", cfg.sessions.table);
                Arc::new(store)
            }
            None => {
                tracing::info!("No session store configured - sessions kept in memory");
                Arc::new(InMemorySessionStore::new())
            }
        };

        Self::with_parts(transport, sessions, cfg.clone())
    }

    pub fn with_parts(
        transport: Arc<dyn ChatTransport>,
        sessions: Arc<dyn SessionStore>,
        config: Config,
    ) -> Self {
        Self {
            transport,
            sessions,
            config,
        }
    }

    pub fn new_conversation(&self) -> ChatController {
        ChatController::new(Arc::clone(&self.transport), self.config.chat.clone())
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
