use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;

/// Item store: every questionnaire item keyed by its `linkId`.
pub type Items = HashMap<String, Item>;

/// FHIR `Questionnaire.item.type` (R4 value set, closed).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ItemType {
    Group,
    Display,
    Boolean,
    Decimal,
    Integer,
    Date,
    #[serde(rename = "dateTime")]
    DateTime,
    Time,
    String,
    Text,
    Url,
    Choice,
    OpenChoice,
    Attachment,
    Reference,
    Quantity,
}

impl ItemType {
    pub const ALL: [ItemType; 16] = [
        ItemType::Group,
        ItemType::Display,
        ItemType::Boolean,
        ItemType::Decimal,
        ItemType::Integer,
        ItemType::Date,
        ItemType::DateTime,
        ItemType::Time,
        ItemType::String,
        ItemType::Text,
        ItemType::Url,
        ItemType::Choice,
        ItemType::OpenChoice,
        ItemType::Attachment,
        ItemType::Reference,
        ItemType::Quantity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Group => "group",
            ItemType::Display => "display",
            ItemType::Boolean => "boolean",
            ItemType::Decimal => "decimal",
            ItemType::Integer => "integer",
            ItemType::Date => "date",
            ItemType::DateTime => "dateTime",
            ItemType::Time => "time",
            ItemType::String => "string",
            ItemType::Text => "text",
            ItemType::Url => "url",
            ItemType::Choice => "choice",
            ItemType::OpenChoice => "open-choice",
            ItemType::Attachment => "attachment",
            ItemType::Reference => "reference",
            ItemType::Quantity => "quantity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Display items carry no answers and may not nest other items.
    pub fn can_have_children(&self) -> bool {
        !matches!(self, ItemType::Display)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnableWhenOperator {
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnableBehavior {
    All,
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Coding {
    pub fn new(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            display: Some(display.into()),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A condition gating an item on the answer to another item.
///
/// `question` is a weak reference: it names a `linkId` and is checked by
/// the orphan validator, never resolved eagerly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnableWhen {
    pub question: String,
    pub operator: EnableWhenOperator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_decimal: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_integer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_coding: Option<Coding>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl EnableWhen {
    pub fn new(question: impl Into<String>, operator: EnableWhenOperator) -> Self {
        Self {
            question: question.into(),
            operator,
            answer_boolean: None,
            answer_decimal: None,
            answer_integer: None,
            answer_date: None,
            answer_date_time: None,
            answer_time: None,
            answer_string: None,
            answer_coding: None,
            extras: Map::new(),
        }
    }

    pub fn with_answer_boolean(mut self, answer: bool) -> Self {
        self.answer_boolean = Some(answer);
        self
    }

    pub fn with_answer_coding(mut self, coding: Coding) -> Self {
        self.answer_coding = Some(coding);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_integer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_selected: Option<bool>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl AnswerOption {
    pub fn coding(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            value_coding: Some(Coding::new(code, display)),
            ..Default::default()
        }
    }

    /// Translation key of this option (the coding's code), if it has one.
    pub fn code(&self) -> Option<&str> {
        self.value_coding.as_ref().and_then(|c| c.code.as_deref())
    }

    /// Default-language label shown for this option.
    pub fn label(&self) -> Option<&str> {
        self.value_coding.as_ref().and_then(|c| c.display.as_deref())
    }
}

/// One question, group or display node, without its children.
///
/// Containment lives in the [`OrderIndex`](super::OrderIndex); fields this
/// model does not know are kept in `extras` and written back on export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub link_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enable_when: Vec<EnableWhen>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_behavior: Option<EnableBehavior>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeats: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_value_set: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer_option: Vec<AnswerOption>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Item {
    pub fn new(link_id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            link_id: link_id.into(),
            item_type,
            text: None,
            prefix: None,
            definition: None,
            enable_when: Vec::new(),
            enable_behavior: None,
            required: None,
            repeats: None,
            read_only: None,
            max_length: None,
            answer_value_set: None,
            answer_option: Vec::new(),
            extras: Map::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_enable_when(mut self, condition: EnableWhen) -> Self {
        self.enable_when.push(condition);
        self
    }

    pub fn with_answer_value_set(mut self, reference: impl Into<String>) -> Self {
        self.answer_value_set = Some(reference.into());
        self
    }

    pub fn with_answer_option(mut self, option: AnswerOption) -> Self {
        self.answer_option.push(option);
        self
    }

    /// Id of the contained resource named by `answerValueSet`, when it is a
    /// local (`#id`) reference rather than a canonical URL.
    pub fn contained_value_set(&self) -> Option<&str> {
        self.answer_value_set
            .as_deref()
            .and_then(|reference| reference.strip_prefix('#'))
    }

    pub fn has_option_code(&self, code: &str) -> bool {
        self.answer_option.iter().any(|o| o.code() == Some(code))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.link_id, self.item_type)?;
        if let Some(text) = &self.text {
            write!(f, ": {text}")?;
        }
        Ok(())
    }
}
