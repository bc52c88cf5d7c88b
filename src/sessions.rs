use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::RwLock;

use crate::config::SessionsConfig;
use crate::error::{GreenieError, Result};
use crate::models::ChatSession;

/// Storage for saved conversations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session, replacing any existing session with the same id
    async fn save_session(&self, session: &ChatSession) -> Result<()>;

    /// All sessions, newest `created_at` first
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>>;
}

/// Process-local store, used when no remote store is configured.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<Vec<ChatSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_session(&self, session: &ChatSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let mut sessions = self.sessions.read().await.clone();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }
}

/// Sessions kept in a PostgREST-style table (`{url}/rest/v1/{table}`).
pub struct RestSessionStore {
    client: Client,
    table_url: String,
    api_key: String,
}

impl RestSessionStore {
    pub fn new(url: &str, table: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            table_url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
            api_key: api_key.into(),
        }
    }

    /// Builds a store from config, or `None` when no remote store is configured.
    pub fn from_config(config: &SessionsConfig) -> Option<Self> {
        match (&config.url, &config.api_key) {
            (Some(url), Some(key)) => Some(Self::new(url, &config.table, key.clone())),
            _ => None,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<Vec<ChatSession>> {
        let response = self
            .authorized(self.client.get(&self.table_url))
            .query(query)
            .send()
            .await
            .map_err(|e| GreenieError::SessionStore(format!("Failed to query sessions: {e}")))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| GreenieError::SessionStore(format!("Failed to decode sessions: {e}")))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::error!("Session store returned {}: {}", status, body);
    Err(GreenieError::SessionStore(format!("status {status}: {body}")))
}

#[async_trait]
impl SessionStore for RestSessionStore {
    async fn save_session(&self, session: &ChatSession) -> Result<()> {
        tracing::info!("Saving chat session {} ({})", session.id, session.title);
        let response = self
            .authorized(self.client.post(&self.table_url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(session)
            .send()
            .await
            .map_err(|e| GreenieError::SessionStore(format!("Failed to save session: {e}")))?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        self.fetch(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ])
        .await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>> {
        let rows = self
            .fetch(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .await?;
        Ok(rows.into_iter().next())
    }
}
