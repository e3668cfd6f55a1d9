use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::Result;

/// Content fingerprint of an exported questionnaire document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFingerprint {
    /// Backend document identifier, when known
    pub document_id: Option<String>,
    /// SHA-256 hash of the serialized document
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentFingerprint {
    pub fn new(document_id: Option<String>, content_hash: String) -> Self {
        Self {
            document_id,
            content_hash,
            created_at: Utc::now(),
        }
    }

    /// Same document content, regardless of when either fingerprint was taken
    pub fn matches(&self, other: &DocumentFingerprint) -> bool {
        self.content_hash == other.content_hash
    }

    /// Short form of the hash for logging
    pub fn short_hash(&self) -> &str {
        self.content_hash.get(..8).unwrap_or(&self.content_hash)
    }
}

/// Hash an exported document. Object keys serialize in sorted order, so equal
/// documents always hash equally.
pub fn fingerprint_document(document_id: Option<&str>, document: &Value) -> Result<DocumentFingerprint> {
    let bytes = serde_json::to_vec(document)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let content_hash = format!("{:x}", hasher.finalize());

    Ok(DocumentFingerprint::new(
        document_id.map(str::to_string),
        content_hash,
    ))
}
