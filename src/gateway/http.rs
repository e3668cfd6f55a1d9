use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

use super::SyncGateway;
use crate::core::GatewayConfig;
use crate::error::{GatewayError, GatewayResult, QuestionnaireError, Result};

/// [`SyncGateway`] over the backend's JSON-over-POST endpoints.
#[derive(Debug, Clone)]
pub struct HttpSyncGateway {
    client: reqwest::Client,
    config: GatewayConfig,
    load_url: Url,
    save_url: Url,
    messages_url: Url,
}

impl HttpSyncGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("octofhir-questionnaire/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuestionnaireError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            load_url: config.load_url()?,
            save_url: config.save_url()?,
            messages_url: config.messages_url()?,
            client,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// POST `body` and return the response text of a successful call.
    async fn post(&self, url: &Url, session_key: &str, body: &Value) -> GatewayResult<String> {
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(session_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("request failed");
            return Err(GatewayError::from_status(status.as_u16(), reason));
        }

        response
            .text()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))
    }
}

fn parse_body(text: &str) -> GatewayResult<Value> {
    serde_json::from_str(text).map_err(|e| GatewayError::InvalidResponse {
        message: e.to_string(),
    })
}

#[async_trait]
impl SyncGateway for HttpSyncGateway {
    async fn load(&self, session_key: &str, document_id: &str) -> GatewayResult<Value> {
        debug!(document_id, "loading questionnaire");
        let text = self
            .post(&self.load_url, session_key, &json!({ "uuid": document_id }))
            .await?;
        parse_body(&text)
    }

    async fn save(
        &self,
        session_key: &str,
        document_id: &str,
        document: &Value,
    ) -> GatewayResult<()> {
        let body = json!({ "uuid": document_id, "json": document.to_string() });
        self.post(&self.save_url, session_key, &body).await?;
        info!(document_id, "questionnaire saved");
        Ok(())
    }

    async fn load_messages(
        &self,
        session_key: &str,
        locale: &str,
    ) -> GatewayResult<HashMap<String, String>> {
        let body = json!({ "context": self.config.messages_context, "locale": locale });
        let text = self.post(&self.messages_url, session_key, &body).await?;
        parse_messages(&text)
    }
}

/// Message catalogue from a response body. Some backends send the object
/// itself as a JSON string, so one level of string encoding is unwrapped.
fn parse_messages(text: &str) -> GatewayResult<HashMap<String, String>> {
    let body = match parse_body(text)? {
        Value::String(inner) => parse_body(&inner)?,
        other => other,
    };
    let Value::Object(entries) = body else {
        return Err(GatewayError::InvalidResponse {
            message: "messages response is not a JSON object".to_string(),
        });
    };
    Ok(entries
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => (key, text),
            other => (key, other.to_string()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_resolved_up_front() {
        let gateway = HttpSyncGateway::new(
            GatewayConfig::default().with_base_url("https://forms.example.org/"),
        )
        .unwrap();
        assert_eq!(
            gateway.load_url.as_str(),
            "https://forms.example.org/gbom/common/questionnaire/loadJson"
        );
    }

    #[test]
    fn test_messages_body_plain_or_string_encoded() {
        let plain = parse_messages(r#"{"save": "Lagre", "count": 3}"#).unwrap();
        assert_eq!(plain["save"], "Lagre");
        assert_eq!(plain["count"], "3");

        let encoded = serde_json::to_string(r#"{"save": "Lagre"}"#).unwrap();
        assert_eq!(parse_messages(&encoded).unwrap()["save"], "Lagre");

        assert!(matches!(
            parse_messages("[1, 2]"),
            Err(GatewayError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpSyncGateway::new(GatewayConfig::default().with_base_url("not a url"));
        assert!(matches!(result, Err(QuestionnaireError::UrlParse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let config = GatewayConfig::default()
            .with_base_url("http://127.0.0.1:9/")
            .with_timeout(std::time::Duration::from_millis(500));
        let gateway = HttpSyncGateway::new(config).unwrap();
        let err = gateway.load("key", "doc").await.unwrap_err();
        assert!(matches!(err, GatewayError::ServerUnavailable { .. }));
    }
}
