use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::{QuestionnaireError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_LOAD_PATH: &str = "/gbom/common/questionnaire/loadJson";
pub const DEFAULT_SAVE_PATH: &str = "/gbom/common/questionnaire/saveJson";
pub const DEFAULT_MESSAGES_PATH: &str = "/gbom/system/messages/loadMessages";
pub const DEFAULT_MESSAGES_CONTEXT: &str = "fhirQuestionnaireEditor";
pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub gateway: GatewayConfig,
}

/// Where and how the backend that stores questionnaires is reached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub load_path: String,
    pub save_path: String,
    pub messages_path: String,
    pub messages_context: String,
    pub timeout: Duration,
}

/// Per-session parameters handed over by the hosting environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub session_key: String,
    pub document_id: String,
    pub locale: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            load_path: DEFAULT_LOAD_PATH.to_string(),
            save_path: DEFAULT_SAVE_PATH.to_string(),
            messages_path: DEFAULT_MESSAGES_PATH.to_string(),
            messages_context: DEFAULT_MESSAGES_CONTEXT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    /// Read a JSON configuration file; missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: EditorConfig = serde_json::from_str(&text)?;
        config.gateway.validate()?;
        Ok(config)
    }
}

impl GatewayConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_messages_context(mut self, context: impl Into<String>) -> Self {
        self.messages_context = context.into();
        self
    }

    pub fn load_url(&self) -> Result<Url> {
        self.endpoint(&self.load_path)
    }

    pub fn save_url(&self) -> Result<Url> {
        self.endpoint(&self.save_path)
    }

    pub fn messages_url(&self) -> Result<Url> {
        self.endpoint(&self.messages_path)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?.join(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.base_url)?;
        if base.cannot_be_a_base() {
            return Err(QuestionnaireError::Configuration {
                message: format!("base_url '{}' cannot be used as a base", self.base_url),
            });
        }
        if self.timeout.is_zero() {
            return Err(QuestionnaireError::Configuration {
                message: "timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl SessionConfig {
    pub fn new(session_key: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            document_id: document_id.into(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Parse `sessionKey=..&uuid=..&locale=..` as handed over in a launch URL.
    /// A leading `?` is accepted.
    pub fn from_query(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut session_key = None;
        let mut document_id = None;
        let mut locale = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "sessionKey" => session_key = Some(value.into_owned()),
                "uuid" => document_id = Some(value.into_owned()),
                "locale" => locale = Some(value.into_owned()),
                _ => {}
            }
        }

        let config = Self {
            session_key: session_key.unwrap_or_default(),
            document_id: document_id.unwrap_or_default(),
            locale: locale
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_key.trim().is_empty() {
            return Err(QuestionnaireError::Configuration {
                message: "session key is required".to_string(),
            });
        }
        if self.document_id.trim().is_empty() {
            return Err(QuestionnaireError::Configuration {
                message: "document id is required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let config = GatewayConfig::default().with_base_url("https://forms.example.org/app/");
        assert_eq!(
            config.save_url().unwrap().as_str(),
            "https://forms.example.org/gbom/common/questionnaire/saveJson"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_from_query() {
        let session =
            SessionConfig::from_query("?sessionKey=abc%3D&uuid=42&locale=nb-NO").unwrap();
        assert_eq!(session.session_key, "abc=");
        assert_eq!(session.document_id, "42");
        assert_eq!(session.locale, "nb-NO");
    }

    #[test]
    fn test_session_requires_document() {
        let err = SessionConfig::from_query("sessionKey=abc").unwrap_err();
        assert!(matches!(err, QuestionnaireError::Configuration { .. }));
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, r#"{ "gateway": { "base_url": "https://forms.example.org/" } }"#)
            .unwrap();

        let config = EditorConfig::from_file(&path).unwrap();
        assert_eq!(config.gateway.base_url, "https://forms.example.org/");
        assert_eq!(config.gateway.messages_context, DEFAULT_MESSAGES_CONTEXT);

        std::fs::write(&path, r#"{ "gateway": { "base_url": "mailto:x@example.org" } }"#).unwrap();
        assert!(EditorConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = GatewayConfig::default().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
