use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Additional languages keyed by language code.
pub type Languages = HashMap<String, Translation>;

static LANGUAGE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{1,8})*$").expect("language code pattern is valid")
});

pub fn is_valid_language_code(code: &str) -> bool {
    LANGUAGE_CODE.is_match(code)
}

/// A translatable field of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "field", content = "code", rename_all = "camelCase")]
pub enum TranslatableField {
    Text,
    Prefix,
    AnswerOption(String),
}

impl fmt::Display for TranslatableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslatableField::Text => f.write_str("text"),
            TranslatableField::Prefix => f.write_str("prefix"),
            TranslatableField::AnswerOption(code) => write!(f, "answerOption[{code}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataTranslationField {
    Title,
    Description,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemTranslation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub answer_options: HashMap<String, String>,
}

impl ItemTranslation {
    pub fn get(&self, field: &TranslatableField) -> Option<&str> {
        match field {
            TranslatableField::Text => self.text.as_deref(),
            TranslatableField::Prefix => self.prefix.as_deref(),
            TranslatableField::AnswerOption(code) => self.answer_options.get(code).map(String::as_str),
        }
    }

    /// Set or clear one field; empty strings clear.
    pub fn set(&mut self, field: &TranslatableField, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        match field {
            TranslatableField::Text => self.text = value,
            TranslatableField::Prefix => self.prefix = value,
            TranslatableField::AnswerOption(code) => match value {
                Some(value) => {
                    self.answer_options.insert(code.clone(), value);
                }
                None => {
                    self.answer_options.remove(code);
                }
            },
        }
    }

    pub fn key_count(&self) -> usize {
        usize::from(self.text.is_some()) + usize::from(self.prefix.is_some()) + self.answer_options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MetadataTranslation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetadataTranslation {
    pub fn get(&self, field: MetadataTranslationField) -> Option<&str> {
        match field {
            MetadataTranslationField::Title => self.title.as_deref(),
            MetadataTranslationField::Description => self.description.as_deref(),
        }
    }

    pub fn set(&mut self, field: MetadataTranslationField, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        match field {
            MetadataTranslationField::Title => self.title = value,
            MetadataTranslationField::Description => self.description = value,
        }
    }

    pub fn key_count(&self) -> usize {
        usize::from(self.title.is_some()) + usize::from(self.description.is_some())
    }
}

/// Localization overlay for one additional language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Translation {
    #[serde(default)]
    pub items: HashMap<String, ItemTranslation>,
    #[serde(default)]
    pub metadata: MetadataTranslation,
}

impl Translation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(&self, link_id: &str) -> Option<&ItemTranslation> {
        self.items.get(link_id)
    }

    pub fn get(&self, link_id: &str, field: &TranslatableField) -> Option<&str> {
        self.item(link_id).and_then(|t| t.get(field))
    }

    /// Set or clear one item field, dropping the item entry once it is empty.
    pub fn set(&mut self, link_id: &str, field: &TranslatableField, value: Option<String>) {
        let entry = self.items.entry(link_id.to_string()).or_default();
        entry.set(field, value);
        if entry.is_empty() {
            self.items.remove(link_id);
        }
    }

    pub fn key_count(&self) -> usize {
        self.items.values().map(ItemTranslation::key_count).sum::<usize>() + self.metadata.key_count()
    }

    /// A language with no translated keys counts as "not started".
    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }
}

/// True when at least one additional language has translated content.
pub fn has_translations(languages: &Languages) -> bool {
    languages.values().any(|translation| !translation.is_empty())
}
