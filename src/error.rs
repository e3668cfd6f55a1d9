use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuestionnaireError {
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Import error: {0}")]
    Import(#[from] MalformedDocumentError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// What kind of entity a dispatched action referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Item,
    Language,
    ContainedResource,
    AnswerOption,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Item => "item",
            ReferenceKind::Language => "language",
            ReferenceKind::ContainedResource => "contained resource",
            ReferenceKind::AnswerOption => "answer option",
        };
        f.write_str(name)
    }
}

/// Rejection of an action by the reducer. The state is never modified when
/// one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unsupported action type: {action_type}")]
    UnsupportedAction { action_type: String },

    #[error("Referenced {kind} '{id}' does not exist")]
    ReferenceNotFound { kind: ReferenceKind, id: String },

    #[error("Item with linkId '{link_id}' already exists")]
    DuplicateLinkId { link_id: String },

    #[error("Invalid structure: {message}")]
    InvalidStructure { message: String },

    #[error("Language '{code}' conflicts with the document languages")]
    LanguageConflict { code: String },

    #[error("Invalid language code: '{code}'")]
    InvalidLanguageCode { code: String },

    #[error("Invalid action payload: {message}")]
    InvalidPayload { message: String },
}

impl DispatchError {
    pub fn item_not_found(link_id: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            kind: ReferenceKind::Item,
            id: link_id.into(),
        }
    }

    pub fn language_not_found(code: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            kind: ReferenceKind::Language,
            id: code.into(),
        }
    }

    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}

/// Import-time schema violation, carrying a locator to the offending fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed document at {path}: {message}")]
pub struct MalformedDocumentError {
    pub message: String,
    pub path: String,
}

impl MalformedDocumentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: "Questionnaire".to_string(),
        }
    }

    pub fn with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Transport-level failure reported by a sync gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Unauthorized: the session key was rejected")]
    Unauthorized,

    #[error("Document not found")]
    NotFound,

    #[error("Conflict: the document was modified concurrently")]
    Conflict,

    #[error("Server unavailable: {message}")]
    ServerUnavailable { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl GatewayError {
    /// Classify a non-success HTTP status code.
    pub fn from_status(status: u16, reason: impl Into<String>) -> Self {
        match status {
            401 | 403 => GatewayError::Unauthorized,
            404 => GatewayError::NotFound,
            409 | 412 => GatewayError::Conflict,
            _ => GatewayError::ServerUnavailable {
                message: format!("HTTP {status}: {}", reason.into()),
            },
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        GatewayError::ServerUnavailable {
            message: message.into(),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

pub type Result<T> = std::result::Result<T, QuestionnaireError>;
