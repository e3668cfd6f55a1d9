//! Wire document to [`TreeState`].

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::ConverterConfig;
use super::extensions::{TranslationEntries, take_additional_languages, take_translations};
use crate::error::MalformedDocumentError;
use crate::store::TreeState;
use crate::types::{
    ContainedResource, Item, ItemType, Items, Languages, Metadata, MetadataTranslationField,
    OrderIndex, TranslatableField, is_valid_language_code,
};

const ROOT: &str = "Questionnaire";

/// Translations found on one item, waiting for the language table.
struct PendingTranslations {
    link_id: String,
    entries: Vec<(TranslatableField, TranslationEntries)>,
}

/// One `item` array still to be read.
struct Pending<'a> {
    entries: &'a [Value],
    next: usize,
    parent: Option<String>,
    path: String,
}

pub(super) struct Importer<'c> {
    config: &'c ConverterConfig,
    items: Items,
    order: OrderIndex,
    /// Item paths in document order, for error locations after the walk.
    paths: Vec<(String, String)>,
    translations: Vec<PendingTranslations>,
}

impl<'c> Importer<'c> {
    pub(super) fn new(config: &'c ConverterConfig) -> Self {
        Self {
            config,
            items: Items::new(),
            order: OrderIndex::new(),
            paths: Vec::new(),
            translations: Vec::new(),
        }
    }

    pub(super) fn run(mut self, document: &Value) -> Result<TreeState, MalformedDocumentError> {
        let root = document
            .as_object()
            .ok_or_else(|| MalformedDocumentError::new("document must be a JSON object"))?;

        match root.get("resourceType").and_then(Value::as_str) {
            Some("Questionnaire") => {}
            Some(other) => {
                return Err(MalformedDocumentError::with_path(
                    format!("expected resourceType 'Questionnaire', found '{other}'"),
                    format!("{ROOT}.resourceType"),
                ));
            }
            None => {
                return Err(MalformedDocumentError::with_path(
                    "missing resourceType",
                    format!("{ROOT}.resourceType"),
                ));
            }
        }

        let mut header: Map<String, Value> = root
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "resourceType" | "item" | "contained"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let title_translations = take_translations(&mut header, "_title", ROOT)?;
        let description_translations = take_translations(&mut header, "_description", ROOT)?;

        let mut metadata: Metadata = serde_json::from_value(Value::Object(header))
            .map_err(|e| MalformedDocumentError::with_path(e.to_string(), ROOT))?;
        let declared = take_additional_languages(&mut metadata.extension, ROOT)?;
        if !self.config.preserve_unknown_fields {
            metadata.extras.clear();
        }

        let contained = read_contained(root.get("contained"))?;

        if let Some(items) = root.get("item") {
            let entries = items.as_array().ok_or_else(|| {
                MalformedDocumentError::with_path("item must be an array", format!("{ROOT}.item"))
            })?;
            self.read_items(entries)?;
        }
        self.check_enable_when()?;

        let default_language = metadata.language.clone();
        let mut languages = Languages::new();
        for code in declared {
            declare_language(&mut languages, default_language.as_deref(), &code);
        }

        for (field, entries) in [
            (MetadataTranslationField::Title, title_translations),
            (MetadataTranslationField::Description, description_translations),
        ] {
            for (language, content) in entries {
                if let Some(translation) =
                    declare_language(&mut languages, default_language.as_deref(), &language)
                {
                    translation.metadata.set(field, Some(content));
                }
            }
        }

        for pending in std::mem::take(&mut self.translations) {
            for (field, entries) in pending.entries {
                for (language, content) in entries {
                    if let Some(translation) =
                        declare_language(&mut languages, default_language.as_deref(), &language)
                    {
                        translation.set(&pending.link_id, &field, Some(content));
                    }
                }
            }
        }

        info!(
            items = self.items.len(),
            languages = languages.len(),
            contained = contained.len(),
            "imported questionnaire"
        );

        Ok(TreeState {
            items: self.items,
            order: self.order,
            metadata,
            contained,
            additional_languages: languages,
            is_dirty: false,
            saved_at: None,
        })
    }

    /// Pre-order walk over the nested `item` arrays with an explicit stack.
    fn read_items<'v>(&mut self, top: &'v [Value]) -> Result<(), MalformedDocumentError> {
        let mut stack: Vec<Pending<'v>> = vec![Pending {
            entries: top,
            next: 0,
            parent: None,
            path: ROOT.to_string(),
        }];

        while let Some(pending) = stack.last_mut() {
            let index = pending.next;
            let entries: &'v [Value] = pending.entries;
            let Some(entry) = entries.get(index) else {
                stack.pop();
                continue;
            };
            pending.next += 1;
            let parent = pending.parent.clone();
            let path = format!("{}.item[{index}]", pending.path);

            let (item, children) = self.read_item(entry, &path)?;
            let link_id = item.link_id.clone();

            if self.items.contains_key(&link_id) {
                let first = self
                    .paths
                    .iter()
                    .find(|(id, _)| *id == link_id)
                    .map(|(_, at)| at.as_str())
                    .unwrap_or(ROOT);
                return Err(MalformedDocumentError::with_path(
                    format!("duplicate linkId '{link_id}' (first defined at {first})"),
                    format!("{path}.linkId"),
                ));
            }

            self.order.insert(parent.as_deref(), None, link_id.clone());
            self.items.insert(link_id.clone(), item);
            self.paths.push((link_id.clone(), path.clone()));

            if let Some(children) = children {
                stack.push(Pending {
                    entries: children,
                    next: 0,
                    parent: Some(link_id),
                    path,
                });
            }
        }
        Ok(())
    }

    fn read_item<'v>(
        &mut self,
        entry: &'v Value,
        path: &str,
    ) -> Result<(Item, Option<&'v [Value]>), MalformedDocumentError> {
        let object = entry
            .as_object()
            .ok_or_else(|| MalformedDocumentError::with_path("item must be an object", path))?;

        let link_id = object
            .get("linkId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                MalformedDocumentError::with_path(
                    "linkId must be a non-empty string",
                    format!("{path}.linkId"),
                )
            })?;

        let type_name = object.get("type").and_then(Value::as_str).ok_or_else(|| {
            MalformedDocumentError::with_path("missing item type", format!("{path}.type"))
        })?;
        if ItemType::parse(type_name).is_none() {
            return Err(MalformedDocumentError::with_path(
                format!("unsupported item type '{type_name}'"),
                format!("{path}.type"),
            ));
        }

        let children = match object.get("item") {
            None => None,
            Some(Value::Array(children)) => Some(children.as_slice()),
            Some(_) => {
                return Err(MalformedDocumentError::with_path(
                    "item must be an array",
                    format!("{path}.item"),
                ));
            }
        };

        let mut fields: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| key.as_str() != "item")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut entries = vec![
            (TranslatableField::Text, take_translations(&mut fields, "_text", path)?),
            (TranslatableField::Prefix, take_translations(&mut fields, "_prefix", path)?),
        ];
        if let Some(Value::Array(options)) = fields.get_mut("answerOption") {
            for (index, option) in options.iter_mut().enumerate() {
                let option_path = format!("{path}.answerOption[{index}].valueCoding");
                let Some(Value::Object(coding)) = option.get_mut("valueCoding") else {
                    continue;
                };
                let found = take_translations(coding, "_display", &option_path)?;
                if found.is_empty() {
                    continue;
                }
                let code = coding.get("code").and_then(Value::as_str).ok_or_else(|| {
                    MalformedDocumentError::with_path(
                        "translated answer option has no code",
                        format!("{option_path}.code"),
                    )
                })?;
                entries.push((TranslatableField::AnswerOption(code.to_string()), found));
            }
        }

        let mut item: Item = serde_json::from_value(Value::Object(fields))
            .map_err(|e| MalformedDocumentError::with_path(e.to_string(), path))?;
        if !self.config.preserve_unknown_fields {
            item.extras.clear();
        }

        entries.retain(|(_, found)| !found.is_empty());
        if !entries.is_empty() {
            self.translations.push(PendingTranslations {
                link_id: link_id.to_string(),
                entries,
            });
        }

        Ok((item, children))
    }

    /// Conditions must name an item of this document.
    fn check_enable_when(&self) -> Result<(), MalformedDocumentError> {
        for (link_id, path) in &self.paths {
            let Some(item) = self.items.get(link_id) else {
                continue;
            };
            for (index, condition) in item.enable_when.iter().enumerate() {
                if !self.items.contains_key(&condition.question) {
                    return Err(MalformedDocumentError::with_path(
                        format!("enableWhen refers to undefined linkId '{}'", condition.question),
                        format!("{path}.enableWhen[{index}].question"),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn read_contained(value: Option<&Value>) -> Result<Vec<ContainedResource>, MalformedDocumentError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let entries = value.as_array().ok_or_else(|| {
        MalformedDocumentError::with_path("contained must be an array", format!("{ROOT}.contained"))
    })?;

    let mut seen = HashSet::new();
    let mut resources = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let path = format!("{ROOT}.contained[{index}]");
        for key in ["resourceType", "id"] {
            let present = entry
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.is_empty());
            if !present {
                return Err(MalformedDocumentError::with_path(
                    format!("contained resource has no {key}"),
                    format!("{path}.{key}"),
                ));
            }
        }
        let resource: ContainedResource = serde_json::from_value(entry.clone())
            .map_err(|e| MalformedDocumentError::with_path(e.to_string(), &path))?;
        if !seen.insert(resource.id.clone()) {
            return Err(MalformedDocumentError::with_path(
                format!("duplicate contained resource id '{}'", resource.id),
                format!("{path}.id"),
            ));
        }
        resources.push(resource);
    }
    Ok(resources)
}

/// Entry for `code` in the language table, or `None` when the code cannot be
/// an additional language.
fn declare_language<'l>(
    languages: &'l mut Languages,
    default_language: Option<&str>,
    code: &str,
) -> Option<&'l mut crate::types::Translation> {
    if default_language == Some(code) {
        warn!(language = code, "ignoring translation into the default language");
        return None;
    }
    if !is_valid_language_code(code) {
        warn!(language = code, "ignoring translation with an invalid language code");
        return None;
    }
    Some(languages.entry(code.to_string()).or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn import(document: Value) -> Result<TreeState, MalformedDocumentError> {
        Importer::new(&ConverterConfig::default()).run(&document)
    }

    #[test]
    fn test_nested_items_keep_order() {
        let state = import(json!({
            "resourceType": "Questionnaire",
            "status": "draft",
            "item": [
                { "linkId": "g", "type": "group", "item": [
                    { "linkId": "q2", "type": "string" },
                    { "linkId": "q1", "type": "boolean" }
                ]},
                { "linkId": "end", "type": "display", "text": "Thanks" }
            ]
        }))
        .unwrap();

        assert_eq!(state.order.roots, vec!["g", "end"]);
        assert_eq!(state.order.children_of("g"), ["q2", "q1"]);
        assert!(!state.is_dirty);
    }

    #[test]
    fn test_item_without_link_id_reports_path() {
        let err = import(json!({
            "resourceType": "Questionnaire",
            "item": [
                { "linkId": "g", "type": "group", "item": [
                    { "linkId": "a", "type": "string" },
                    { "type": "string" }
                ]}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.path, "Questionnaire.item[0].item[1].linkId");
    }

    #[test]
    fn test_wrong_resource_type() {
        let err = import(json!({ "resourceType": "Patient" })).unwrap_err();
        assert_eq!(err.path, "Questionnaire.resourceType");
    }

    #[test]
    fn test_translation_in_default_language_is_ignored() {
        let state = import(json!({
            "resourceType": "Questionnaire",
            "language": "nb-NO",
            "item": [{
                "linkId": "q", "type": "string", "text": "Navn",
                "_text": { "extension": [{
                    "url": super::super::extensions::TRANSLATION_URL,
                    "extension": [
                        { "url": "lang", "valueCode": "nb-NO" },
                        { "url": "content", "valueString": "Navn" }
                    ]
                }]}
            }]
        }))
        .unwrap();
        assert!(state.additional_languages.is_empty());
    }

    #[test]
    fn test_unknown_fields_can_be_dropped() {
        let config = ConverterConfig {
            preserve_unknown_fields: false,
        };
        let state = Importer::new(&config)
            .run(&json!({
                "resourceType": "Questionnaire",
                "copyright": "(c)",
                "item": [{ "linkId": "q", "type": "string", "code": [] }]
            }))
            .unwrap();
        assert!(state.metadata.extras.is_empty());
        assert!(state.items["q"].extras.is_empty());
    }
}
