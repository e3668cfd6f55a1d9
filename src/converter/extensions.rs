//! FHIR extensions used to carry localization on the wire.
//!
//! Translations ride on the primitive-element companion (`_text`, `_prefix`,
//! `_display`, `_title`, `_description`) using the core `translation`
//! extension; the set of configured languages is listed on the questionnaire
//! itself so that languages without any translation yet survive a round trip.

use serde_json::{Map, Value, json};

use crate::error::MalformedDocumentError;

pub const TRANSLATION_URL: &str = "http://hl7.org/fhir/StructureDefinition/translation";
pub const ADDITIONAL_LANGUAGE_URL: &str =
    "http://octofhir.io/fhir/StructureDefinition/questionnaire-additional-language";

/// `(language, content)` pairs read from or written to a primitive companion.
pub type TranslationEntries = Vec<(String, String)>;

fn url_of(extension: &Value) -> Option<&str> {
    extension.get("url").and_then(Value::as_str)
}

fn translation_extension(language: &str, content: &str) -> Value {
    json!({
        "url": TRANSLATION_URL,
        "extension": [
            { "url": "lang", "valueCode": language },
            { "url": "content", "valueString": content }
        ]
    })
}

fn parse_translation(extension: &Value, path: &str) -> Result<(String, String), MalformedDocumentError> {
    let parts = extension
        .get("extension")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            MalformedDocumentError::with_path("translation extension has no parts", path)
        })?;

    let part = |name: &str, value_key: &str| {
        parts
            .iter()
            .find(|p| url_of(p) == Some(name))
            .and_then(|p| p.get(value_key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let language = part("lang", "valueCode").ok_or_else(|| {
        MalformedDocumentError::with_path("translation extension has no 'lang' part", path)
    })?;
    let content = part("content", "valueString").ok_or_else(|| {
        MalformedDocumentError::with_path("translation extension has no 'content' part", path)
    })?;
    Ok((language, content))
}

/// Remove translation extensions from `holder[key]`, leaving any other
/// extensions or properties of the companion element in place.
pub fn take_translations(
    holder: &mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<TranslationEntries, MalformedDocumentError> {
    let Some(companion) = holder.remove(key) else {
        return Ok(Vec::new());
    };
    let companion_path = format!("{path}.{key}");
    let Value::Object(mut companion) = companion else {
        return Err(MalformedDocumentError::with_path(
            "primitive extension element must be an object",
            companion_path,
        ));
    };

    let mut entries = Vec::new();
    if let Some(extensions) = companion.remove("extension") {
        let Value::Array(extensions) = extensions else {
            return Err(MalformedDocumentError::with_path(
                "extension must be an array",
                format!("{companion_path}.extension"),
            ));
        };
        let mut kept = Vec::new();
        for (index, extension) in extensions.into_iter().enumerate() {
            if url_of(&extension) == Some(TRANSLATION_URL) {
                let at = format!("{companion_path}.extension[{index}]");
                entries.push(parse_translation(&extension, &at)?);
            } else {
                kept.push(extension);
            }
        }
        if !kept.is_empty() {
            companion.insert("extension".to_string(), Value::Array(kept));
        }
    }

    if !companion.is_empty() {
        holder.insert(key.to_string(), Value::Object(companion));
    }
    Ok(entries)
}

/// Append translation extensions to `holder[key]`, creating the companion
/// element when needed.
pub fn put_translations(holder: &mut Map<String, Value>, key: &str, entries: &[(&str, &str)]) {
    if entries.is_empty() {
        return;
    }
    let companion = holder
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !companion.is_object() {
        *companion = Value::Object(Map::new());
    }
    let Value::Object(companion) = companion else {
        return;
    };

    let extensions = companion
        .entry("extension".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(extensions) = extensions {
        extensions.extend(
            entries
                .iter()
                .map(|(language, content)| translation_extension(language, content)),
        );
    }
}

pub fn language_extension(code: &str) -> Value {
    json!({ "url": ADDITIONAL_LANGUAGE_URL, "valueCode": code })
}

/// Split additional-language declarations out of a questionnaire's extensions.
pub fn take_additional_languages(
    extensions: &mut Vec<Value>,
    path: &str,
) -> Result<Vec<String>, MalformedDocumentError> {
    let mut languages = Vec::new();
    let mut kept = Vec::with_capacity(extensions.len());
    for (index, extension) in std::mem::take(extensions).into_iter().enumerate() {
        if url_of(&extension) != Some(ADDITIONAL_LANGUAGE_URL) {
            kept.push(extension);
            continue;
        }
        let code = extension
            .get("valueCode")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MalformedDocumentError::with_path(
                    "additional language extension has no valueCode",
                    format!("{path}.extension[{index}]"),
                )
            })?;
        languages.push(code.to_string());
    }
    *extensions = kept;
    Ok(languages)
}
