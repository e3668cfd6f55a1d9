use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TreeState;
use crate::error::DispatchError;
use crate::types::{
    AnswerOption, ContainedResource, EnableBehavior, EnableWhen, ItemType, MetadataTranslationField,
    PublicationStatus, TranslatableField,
};

/// Single field update on an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum ItemField {
    Text(Option<String>),
    Prefix(Option<String>),
    Definition(Option<String>),
    Type(ItemType),
    Required(Option<bool>),
    Repeats(Option<bool>),
    ReadOnly(Option<bool>),
    MaxLength(Option<u32>),
    EnableWhen(Vec<EnableWhen>),
    EnableBehavior(Option<EnableBehavior>),
    AnswerValueSet(Option<String>),
    AnswerOptions(Vec<AnswerOption>),
}

/// Single field update on the document metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum MetadataField {
    Id(Option<String>),
    Url(Option<String>),
    Name(Option<String>),
    Title(Option<String>),
    Version(Option<String>),
    Status(Option<PublicationStatus>),
    Date(Option<String>),
    Publisher(Option<String>),
    Description(Option<String>),
}

/// Every state change the editor can make.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    NewQuestionnaire {
        #[serde(default)]
        language: Option<String>,
    },
    AddItem {
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        index: Option<usize>,
        item_type: ItemType,
        #[serde(default)]
        text: Option<String>,
        /// Caller-chosen identifier; a fresh UUID is minted when absent.
        #[serde(default)]
        link_id: Option<String>,
    },
    RemoveItem {
        link_id: String,
    },
    MoveItem {
        link_id: String,
        #[serde(default)]
        new_parent: Option<String>,
        index: usize,
    },
    DuplicateItem {
        link_id: String,
    },
    UpdateItem {
        link_id: String,
        change: ItemField,
    },
    UpdateLinkId {
        old_link_id: String,
        new_link_id: String,
    },
    UpdateMetadata {
        change: MetadataField,
    },
    SetDefaultLanguage {
        code: String,
    },
    AddLanguage {
        code: String,
    },
    RemoveLanguage {
        code: String,
    },
    SetItemTranslation {
        language: String,
        link_id: String,
        field: TranslatableField,
        #[serde(default)]
        value: Option<String>,
    },
    SetMetadataTranslation {
        language: String,
        field: MetadataTranslationField,
        #[serde(default)]
        value: Option<String>,
    },
    AddContained {
        resource: ContainedResource,
    },
    RemoveContained {
        id: String,
    },
    ResetQuestionnaire {
        state: Box<TreeState>,
    },
    MarkSaved {
        at: chrono::DateTime<chrono::Utc>,
    },
}

impl Action {
    /// Wire tags of every supported action.
    pub const TYPES: [&'static str; 17] = [
        "new_questionnaire",
        "add_item",
        "remove_item",
        "move_item",
        "duplicate_item",
        "update_item",
        "update_link_id",
        "update_metadata",
        "set_default_language",
        "add_language",
        "remove_language",
        "set_item_translation",
        "set_metadata_translation",
        "add_contained",
        "remove_contained",
        "reset_questionnaire",
        "mark_saved",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            Action::NewQuestionnaire { .. } => "new_questionnaire",
            Action::AddItem { .. } => "add_item",
            Action::RemoveItem { .. } => "remove_item",
            Action::MoveItem { .. } => "move_item",
            Action::DuplicateItem { .. } => "duplicate_item",
            Action::UpdateItem { .. } => "update_item",
            Action::UpdateLinkId { .. } => "update_link_id",
            Action::UpdateMetadata { .. } => "update_metadata",
            Action::SetDefaultLanguage { .. } => "set_default_language",
            Action::AddLanguage { .. } => "add_language",
            Action::RemoveLanguage { .. } => "remove_language",
            Action::SetItemTranslation { .. } => "set_item_translation",
            Action::SetMetadataTranslation { .. } => "set_metadata_translation",
            Action::AddContained { .. } => "add_contained",
            Action::RemoveContained { .. } => "remove_contained",
            Action::ResetQuestionnaire { .. } => "reset_questionnaire",
            Action::MarkSaved { .. } => "mark_saved",
        }
    }

    /// Decode an action arriving as untyped JSON (e.g. from a UI bridge).
    ///
    /// Unknown `type` tags yield [`DispatchError::UnsupportedAction`]; a known
    /// tag with a bad payload yields [`DispatchError::InvalidPayload`].
    pub fn from_json(value: Value) -> Result<Self, DispatchError> {
        let action_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::InvalidPayload {
                message: "action has no string 'type' tag".to_string(),
            })?;

        if !Self::TYPES.contains(&action_type) {
            return Err(DispatchError::UnsupportedAction {
                action_type: action_type.to_string(),
            });
        }

        serde_json::from_value(value).map_err(|e| DispatchError::InvalidPayload {
            message: e.to_string(),
        })
    }

    pub fn reset(state: TreeState) -> Self {
        Action::ResetQuestionnaire {
            state: Box::new(state),
        }
    }

    pub fn add_item(parent: Option<&str>, item_type: ItemType, text: impl Into<String>) -> Self {
        Action::AddItem {
            parent: parent.map(str::to_string),
            index: None,
            item_type,
            text: Some(text.into()),
            link_id: None,
        }
    }

    pub fn update_item(link_id: impl Into<String>, change: ItemField) -> Self {
        Action::UpdateItem {
            link_id: link_id.into(),
            change,
        }
    }
}
