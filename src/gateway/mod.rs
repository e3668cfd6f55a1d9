//! Boundary to the backend that stores questionnaires.
//!
//! The core only sees the [`SyncGateway`] trait. Calls are single-shot: a
//! failure is reported to the caller as is, and any retry policy belongs to
//! the transport.

#[cfg(feature = "http-gateway")]
pub mod http;
pub mod memory;
pub mod session;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::GatewayResult;

#[cfg(feature = "http-gateway")]
pub use http::HttpSyncGateway;
pub use memory::MemoryGateway;
pub use session::{EditorSession, SaveReceipt};

/// Load and save questionnaires, and fetch interface messages.
///
/// Implementations can talk to an HTTP backend or keep documents in memory
/// for tests and offline tools.
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Fetch the wire document identified by `document_id`.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The response body. Some backends send the document as a
    ///   JSON string; callers decode it with
    ///   [`decode_document`](crate::converter::decode_document).
    /// * `Err(GatewayError)` - `Unauthorized`, `NotFound` or `ServerUnavailable`
    async fn load(&self, session_key: &str, document_id: &str) -> GatewayResult<Value>;

    /// Store `document` under `document_id`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The backend acknowledged the save
    /// * `Err(GatewayError)` - `Unauthorized`, `Conflict` or `ServerUnavailable`
    async fn save(&self, session_key: &str, document_id: &str, document: &Value)
    -> GatewayResult<()>;

    /// Interface message catalogue for `locale`, keyed by message id.
    async fn load_messages(
        &self,
        session_key: &str,
        locale: &str,
    ) -> GatewayResult<HashMap<String, String>>;
}
