//! [`TreeState`] to wire document.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::warn;

use super::extensions::{language_extension, put_translations};
use crate::Result;
use crate::store::TreeState;
use crate::types::{Item, MetadataTranslationField, TranslatableField};

/// An item whose children are being assembled.
struct Frame<'s> {
    link_id: &'s str,
    children: &'s [String],
    next: usize,
    built: Vec<Value>,
}

pub(super) struct Exporter<'s> {
    state: &'s TreeState,
    /// Additional languages in code order, so output is deterministic.
    languages: Vec<&'s str>,
}

impl<'s> Exporter<'s> {
    pub(super) fn new(state: &'s TreeState) -> Self {
        let mut languages: Vec<&str> = state
            .additional_languages
            .keys()
            .map(String::as_str)
            .collect();
        languages.sort_unstable();
        Self { state, languages }
    }

    pub(super) fn run(&self) -> Result<Value> {
        let mut root = match serde_json::to_value(&self.state.metadata)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        root.insert("resourceType".to_string(), Value::String("Questionnaire".into()));

        if !self.languages.is_empty() {
            let extensions = root
                .entry("extension".to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(extensions) = extensions {
                extensions.extend(self.languages.iter().map(|code| language_extension(code)));
            }
        }

        for (key, field) in [
            ("_title", MetadataTranslationField::Title),
            ("_description", MetadataTranslationField::Description),
        ] {
            let entries: Vec<(&str, &str)> = self
                .languages
                .iter()
                .filter_map(|code| {
                    self.state.additional_languages[*code]
                        .metadata
                        .get(field)
                        .map(|content| (*code, content))
                })
                .collect();
            put_translations(&mut root, key, &entries);
        }

        if !self.state.contained.is_empty() {
            root.insert("contained".to_string(), serde_json::to_value(&self.state.contained)?);
        }

        let items = self.build_items()?;
        if !items.is_empty() {
            root.insert("item".to_string(), Value::Array(items));
        }

        Ok(Value::Object(root))
    }

    /// Post-order assembly of the nested `item` arrays with an explicit
    /// stack. Entries that are unknown or already emitted are skipped.
    fn build_items(&self) -> Result<Vec<Value>> {
        let state: &'s TreeState = self.state;
        let order = &state.order;
        let mut emitted: HashSet<&'s str> = HashSet::new();
        let mut stack: Vec<Frame<'s>> = Vec::new();
        let mut top: Vec<Value> = Vec::new();
        let mut root_cursor = 0;

        loop {
            let next_id = match stack.last_mut() {
                Some(frame) if frame.next < frame.children.len() => {
                    let children: &'s [String] = frame.children;
                    frame.next += 1;
                    children[frame.next - 1].as_str()
                }
                Some(_) => {
                    let Some(frame) = stack.pop() else { break };
                    let value = self.item_to_wire(frame.link_id, frame.built)?;
                    match stack.last_mut() {
                        Some(parent) => parent.built.push(value),
                        None => top.push(value),
                    }
                    continue;
                }
                None if root_cursor < order.roots.len() => {
                    root_cursor += 1;
                    order.roots[root_cursor - 1].as_str()
                }
                None => break,
            };

            if !state.items.contains_key(next_id) {
                warn!(link_id = next_id, "skipping order entry without an item");
                continue;
            }
            if !emitted.insert(next_id) {
                warn!(link_id = next_id, "skipping repeated order entry");
                continue;
            }
            stack.push(Frame {
                link_id: next_id,
                children: order.children_of(next_id),
                next: 0,
                built: Vec::new(),
            });
        }

        let skipped = state.items.len() - emitted.len();
        if skipped > 0 {
            warn!(count = skipped, "items unreachable from the root were not exported");
        }
        Ok(top)
    }

    fn item_to_wire(&self, link_id: &str, children: Vec<Value>) -> Result<Value> {
        let item: &Item = &self.state.items[link_id];
        let mut object = match serde_json::to_value(item)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (key, field) in [
            ("_text", TranslatableField::Text),
            ("_prefix", TranslatableField::Prefix),
        ] {
            let entries = self.entries_for(link_id, &field);
            put_translations(&mut object, key, &entries);
        }

        if let Some(Value::Array(options)) = object.get_mut("answerOption") {
            for option in options.iter_mut() {
                let Some(Value::Object(coding)) = option.get_mut("valueCoding") else {
                    continue;
                };
                let Some(code) = coding.get("code").and_then(Value::as_str) else {
                    continue;
                };
                let field = TranslatableField::AnswerOption(code.to_string());
                let entries = self.entries_for(link_id, &field);
                put_translations(coding, "_display", &entries);
            }
        }

        if !children.is_empty() {
            object.insert("item".to_string(), Value::Array(children));
        }
        Ok(Value::Object(object))
    }

    fn entries_for(&self, link_id: &str, field: &TranslatableField) -> Vec<(&'s str, &'s str)> {
        let state: &'s TreeState = self.state;
        self.languages
            .iter()
            .filter_map(|code| {
                state.additional_languages[*code]
                    .get(link_id, field)
                    .map(|content| (*code, content))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnswerOption, ItemType, Translation};

    #[test]
    fn test_children_nest_under_parent() {
        let mut state = TreeState::new(Some("en".into()));
        state.items.insert("g".into(), Item::new("g", ItemType::Group));
        state.items.insert("q".into(), Item::new("q", ItemType::String));
        state.order.insert(None, None, "g");
        state.order.insert(Some("g"), None, "q");

        let document = Exporter::new(&state).run().unwrap();
        assert_eq!(document["resourceType"], "Questionnaire");
        assert_eq!(document["item"][0]["linkId"], "g");
        assert_eq!(document["item"][0]["item"][0]["linkId"], "q");
    }

    #[test]
    fn test_option_translation_lands_on_display() {
        let mut state = TreeState::new(Some("en".into()));
        state.items.insert(
            "c".into(),
            Item::new("c", ItemType::Choice).with_answer_option(AnswerOption::coding("y", "Yes")),
        );
        state.order.insert(None, None, "c");
        let mut german = Translation::new();
        german.set("c", &TranslatableField::AnswerOption("y".into()), Some("Ja".into()));
        state.additional_languages.insert("de".into(), german);

        let document = Exporter::new(&state).run().unwrap();
        let display = &document["item"][0]["answerOption"][0]["valueCoding"]["_display"];
        assert_eq!(display["extension"][0]["extension"][1]["valueString"], "Ja");
    }

    #[test]
    fn test_corrupt_order_still_exports() {
        let mut state = TreeState::new(None);
        state.items.insert("a".into(), Item::new("a", ItemType::Group));
        state.order.insert(None, None, "a");
        state.order.children.insert("a".into(), vec!["a".into(), "ghost".into()]);

        let document = Exporter::new(&state).run().unwrap();
        assert_eq!(document["item"].as_array().unwrap().len(), 1);
        assert!(document["item"][0].get("item").is_none());
    }
}
