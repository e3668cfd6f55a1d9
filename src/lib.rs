//! # OctoFHIR Questionnaire
//!
//! Editing engine for FHIR Questionnaire documents: an action-driven tree
//! store, structural and translation validation, lossless conversion to and
//! from the FHIR wire format, and a sync gateway to the backend that stores
//! the documents.
//!
//! ## Features
//!
//! - **Reducer store**: every edit is a typed [`Action`] applied to an
//!   immutable [`TreeState`] snapshot; rejected actions never change state
//! - **Validation**: orphaned items, dangling references, containment cycles
//!   and missing translations reported as data
//! - **Conversion**: import/export of the Questionnaire JSON with translations
//!   carried as FHIR extensions and unknown fields preserved
//! - **Sync**: async [`SyncGateway`] with an HTTP implementation and an
//!   in-memory one for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use octofhir_questionnaire::*;
//!
//! # async fn example() -> Result<()> {
//! let store = TreeStore::new(TreeState::new(Some("en".into())));
//! let state = store
//!     .dispatch(Action::add_item(None, ItemType::String, "Your name"))
//!     .await?;
//!
//! let report = validate_state(&state);
//! assert!(report.is_valid());
//!
//! let document = export_questionnaire(&state)?;
//! let reimported = import_questionnaire(&document)?;
//! assert!(reimported.same_content(&state));
//! # Ok(())
//! # }
//! ```

pub mod converter;
pub mod core;
pub mod error;
pub mod gateway;
pub mod store;
pub mod types;
pub mod utils;
pub mod validation;

pub use converter::{
    ConverterConfig, QuestionnaireConverter, decode_document, export_questionnaire,
    import_questionnaire, parse_document,
};
pub use crate::core::{EditorConfig, GatewayConfig, SessionConfig};
pub use error::Result;
pub use error::{DispatchError, GatewayError, MalformedDocumentError, QuestionnaireError, ReferenceKind};
#[cfg(feature = "http-gateway")]
pub use gateway::HttpSyncGateway;
pub use gateway::{EditorSession, MemoryGateway, SaveReceipt, SyncGateway};
pub use store::{Action, ItemField, MetadataField, TreeState, TreeStore, apply};
pub use types::*;
pub use utils::{DocumentFingerprint, export_file_name, fingerprint_document};
pub use validation::{
    IssueKind, ValidationIssue, ValidationReport, ValidationResult, ValidationSeverity,
    validate_orphaned_items, validate_state, validate_translations,
};
