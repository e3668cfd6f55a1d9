//! Conversion between the FHIR Questionnaire wire document and [`TreeState`].
//!
//! Import flattens the nested `item` arrays into the item store and order
//! index and lifts translation extensions into the language table. Export
//! reverses this. Fields the editor does not model are carried through
//! untouched unless [`ConverterConfig::preserve_unknown_fields`] is off.

mod exporter;
pub mod extensions;
mod importer;

pub use extensions::{ADDITIONAL_LANGUAGE_URL, TRANSLATION_URL};

use serde_json::Value;

use crate::Result;
use crate::error::MalformedDocumentError;
use crate::store::TreeState;
use exporter::Exporter;
use importer::Importer;

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Keep fields outside the editor's model on import so they are written
    /// back on export.
    pub preserve_unknown_fields: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            preserve_unknown_fields: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuestionnaireConverter {
    config: ConverterConfig,
}

impl QuestionnaireConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Build a clean (not dirty) state from a wire document.
    pub fn import(&self, document: &Value) -> std::result::Result<TreeState, MalformedDocumentError> {
        Importer::new(&self.config).run(document)
    }

    /// Serialize `state` to a wire document. Unreachable items are left out.
    pub fn export(&self, state: &TreeState) -> Result<Value> {
        Exporter::new(state).run()
    }
}

pub fn import_questionnaire(document: &Value) -> std::result::Result<TreeState, MalformedDocumentError> {
    QuestionnaireConverter::new().import(document)
}

pub fn export_questionnaire(state: &TreeState) -> Result<Value> {
    QuestionnaireConverter::new().export(state)
}

/// Some servers return the document as a JSON string inside the response
/// body; undo one level of that encoding.
pub fn decode_document(raw: Value) -> std::result::Result<Value, MalformedDocumentError> {
    match raw {
        Value::String(text) => parse_document(&text),
        other => Ok(other),
    }
}

pub fn parse_document(text: &str) -> std::result::Result<Value, MalformedDocumentError> {
    serde_json::from_str(text)
        .map_err(|e| MalformedDocumentError::new(format!("document is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_string_encoded_document() {
        let raw = Value::String(r#"{"resourceType":"Questionnaire"}"#.into());
        let document = decode_document(raw).unwrap();
        assert_eq!(document["resourceType"], "Questionnaire");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_document(Value::String("{not json".into())).unwrap_err();
        assert_eq!(err.path, "Questionnaire");
    }

    #[test]
    fn test_import_export_preserves_unknown_fields() {
        let document = json!({
            "resourceType": "Questionnaire",
            "status": "active",
            "copyright": "Example Org",
            "item": [{ "linkId": "q", "type": "string", "code": [{ "code": "x" }] }]
        });
        let state = import_questionnaire(&document).unwrap();
        let exported = export_questionnaire(&state).unwrap();
        assert_eq!(exported, document);
    }
}
