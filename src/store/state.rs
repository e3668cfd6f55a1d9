use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContainedResource, Item, Items, Languages, Metadata, OrderIndex};

/// Complete editor state for one questionnaire.
///
/// Values of this type are treated as immutable snapshots: the reducer builds
/// a new one for every accepted action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TreeState {
    #[serde(default)]
    pub items: Items,
    #[serde(default)]
    pub order: OrderIndex,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub contained: Vec<ContainedResource>,
    #[serde(default)]
    pub additional_languages: Languages,
    #[serde(default)]
    pub is_dirty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl TreeState {
    /// An empty questionnaire in `language`.
    pub fn new(language: Option<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.language = language;
        Self {
            metadata,
            ..Default::default()
        }
    }

    pub fn item(&self, link_id: &str) -> Option<&Item> {
        self.items.get(link_id)
    }

    pub fn has_item(&self, link_id: &str) -> bool {
        self.items.contains_key(link_id)
    }

    pub fn default_language(&self) -> Option<&str> {
        self.metadata.language.as_deref()
    }

    pub fn has_contained(&self, id: &str) -> bool {
        self.contained.iter().any(|resource| resource.id == id)
    }

    /// Equality over document content only: dirty flag and save time are
    /// session bookkeeping and are ignored.
    pub fn same_content(&self, other: &TreeState) -> bool {
        self.items == other.items
            && self.order == other.order
            && self.metadata == other.metadata
            && self.contained == other.contained
            && self.additional_languages == other.additional_languages
    }
}
