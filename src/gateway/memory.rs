use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::SyncGateway;
use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, Value>,
    /// Accepted session keys; when empty every key is accepted.
    sessions: HashSet<String>,
    messages: HashMap<String, HashMap<String, String>>,
    fail_next_load: Option<GatewayError>,
    fail_next_save: Option<GatewayError>,
    saves: usize,
}

/// In-process [`SyncGateway`] for tests and offline tools.
///
/// Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<RwLock<Inner>>,
    /// Hand documents back as JSON strings, like some backends do.
    string_encoded: bool,
    latency: Option<Duration>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string_encoded(mut self) -> Self {
        self.string_encoded = true;
        self
    }

    /// Delay every call, to keep an exchange in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub async fn insert_document(&self, document_id: impl Into<String>, document: Value) {
        self.inner
            .write()
            .await
            .documents
            .insert(document_id.into(), document);
    }

    pub async fn document(&self, document_id: &str) -> Option<Value> {
        self.inner.read().await.documents.get(document_id).cloned()
    }

    pub async fn allow_session(&self, session_key: impl Into<String>) {
        self.inner.write().await.sessions.insert(session_key.into());
    }

    pub async fn insert_messages(&self, locale: impl Into<String>, messages: HashMap<String, String>) {
        self.inner.write().await.messages.insert(locale.into(), messages);
    }

    /// Make the next `load` fail with `error`.
    pub async fn fail_next_load(&self, error: GatewayError) {
        self.inner.write().await.fail_next_load = Some(error);
    }

    /// Make the next `save` fail with `error`.
    pub async fn fail_next_save(&self, error: GatewayError) {
        self.inner.write().await.fail_next_save = Some(error);
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> usize {
        self.inner.read().await.saves
    }

    fn authorize(inner: &Inner, session_key: &str) -> GatewayResult<()> {
        if inner.sessions.is_empty() || inner.sessions.contains(session_key) {
            Ok(())
        } else {
            Err(GatewayError::Unauthorized)
        }
    }
}

#[async_trait]
impl SyncGateway for MemoryGateway {
    async fn load(&self, session_key: &str, document_id: &str) -> GatewayResult<Value> {
        self.delay().await;
        let mut inner = self.inner.write().await;
        if let Some(error) = inner.fail_next_load.take() {
            return Err(error);
        }
        Self::authorize(&inner, session_key)?;

        let document = inner
            .documents
            .get(document_id)
            .cloned()
            .ok_or(GatewayError::NotFound)?;
        if self.string_encoded {
            Ok(Value::String(document.to_string()))
        } else {
            Ok(document)
        }
    }

    async fn save(
        &self,
        session_key: &str,
        document_id: &str,
        document: &Value,
    ) -> GatewayResult<()> {
        self.delay().await;
        let mut inner = self.inner.write().await;
        if let Some(error) = inner.fail_next_save.take() {
            return Err(error);
        }
        Self::authorize(&inner, session_key)?;

        inner
            .documents
            .insert(document_id.to_string(), document.clone());
        inner.saves += 1;
        Ok(())
    }

    async fn load_messages(
        &self,
        session_key: &str,
        locale: &str,
    ) -> GatewayResult<HashMap<String, String>> {
        let inner = self.inner.read().await;
        Self::authorize(&inner, session_key)?;
        Ok(inner.messages.get(locale).cloned().unwrap_or_default())
    }
}
