use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::SyncGateway;
use crate::converter::{QuestionnaireConverter, decode_document};
use crate::core::SessionConfig;
use crate::error::{QuestionnaireError, Result};
use crate::store::{Action, TreeState, TreeStore};
use crate::utils::{DocumentFingerprint, export_file_name, fingerprint_document};
use crate::validation::{ValidationReport, validate_state};

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub fingerprint: DocumentFingerprint,
    pub saved_at: DateTime<Utc>,
    /// False when the document was edited while the save was in flight; the
    /// state then stays dirty.
    pub marked_saved: bool,
}

/// One editing session on one backend document.
///
/// Ties a [`TreeStore`] to a [`SyncGateway`]. Only one load or save runs at
/// a time, and a failed exchange never touches the tree state.
pub struct EditorSession {
    config: SessionConfig,
    gateway: Arc<dyn SyncGateway>,
    store: TreeStore,
    converter: QuestionnaireConverter,
    exchange: Mutex<()>,
}

impl EditorSession {
    pub fn new(config: SessionConfig, gateway: Arc<dyn SyncGateway>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gateway,
            store: TreeStore::default(),
            converter: QuestionnaireConverter::new(),
            exchange: Mutex::new(()),
        })
    }

    pub fn with_converter(mut self, converter: QuestionnaireConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    pub async fn snapshot(&self) -> Arc<TreeState> {
        self.store.snapshot().await
    }

    pub async fn dispatch(&self, action: Action) -> Result<Arc<TreeState>> {
        Ok(self.store.dispatch(action).await?)
    }

    /// Fetch the document from the backend and replace the current state.
    pub async fn load(&self) -> Result<Arc<TreeState>> {
        let _exchange = self.exchange.lock().await;
        let raw = self
            .gateway
            .load(&self.config.session_key, &self.config.document_id)
            .await?;
        let state = self.open(raw).await?;
        info!(
            document_id = %self.config.document_id,
            items = state.items.len(),
            "questionnaire loaded"
        );
        Ok(state)
    }

    /// Replace the current state with a document obtained elsewhere.
    pub async fn open(&self, raw: Value) -> Result<Arc<TreeState>> {
        let document = decode_document(raw)?;
        let state = self.converter.import(&document)?;
        Ok(self.store.dispatch(Action::reset(state)).await?)
    }

    /// Export the current state and send it to the backend.
    ///
    /// Fails with [`QuestionnaireError::SaveInProgress`] while another load or
    /// save is pending.
    pub async fn save(&self) -> Result<SaveReceipt> {
        let _exchange = self
            .exchange
            .try_lock()
            .map_err(|_| QuestionnaireError::SaveInProgress)?;

        let snapshot = self.store.snapshot().await;
        let document = self.converter.export(&snapshot)?;
        let fingerprint = fingerprint_document(Some(&self.config.document_id), &document)?;

        self.gateway
            .save(&self.config.session_key, &self.config.document_id, &document)
            .await?;

        let saved_at = Utc::now();
        let marked_saved = self
            .store
            .dispatch_if_current(&snapshot, Action::MarkSaved { at: saved_at })
            .await?
            .is_some();
        info!(
            document_id = %self.config.document_id,
            hash = fingerprint.short_hash(),
            marked_saved,
            "questionnaire saved"
        );

        Ok(SaveReceipt {
            fingerprint,
            saved_at,
            marked_saved,
        })
    }

    /// Interface messages for the session's locale.
    pub async fn load_messages(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .gateway
            .load_messages(&self.config.session_key, &self.config.locale)
            .await?)
    }

    pub async fn validate(&self) -> ValidationReport {
        let state = self.store.snapshot().await;
        validate_state(&state)
    }

    pub async fn export(&self) -> Result<Value> {
        let state = self.store.snapshot().await;
        self.converter.export(&state)
    }

    pub async fn fingerprint(&self) -> Result<DocumentFingerprint> {
        let document = self.export().await?;
        fingerprint_document(Some(&self.config.document_id), &document)
    }

    pub async fn file_name(&self) -> String {
        let state = self.store.snapshot().await;
        export_file_name(&state.metadata, &state.additional_languages)
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
