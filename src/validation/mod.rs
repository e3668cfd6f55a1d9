//! Structural and localization checks over a questionnaire snapshot.
//!
//! Validators never fail: every problem they find is returned as a
//! [`ValidationIssue`] for the caller to render or act on.

pub mod orphan;
pub mod translation;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::TreeState;
use crate::types::TranslatableField;

pub use orphan::validate_orphaned_items;
pub use translation::validate_translations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Information,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationSeverity::Error => f.write_str("ERROR"),
            ValidationSeverity::Warning => f.write_str("WARN"),
            ValidationSeverity::Information => f.write_str("INFO"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    OrphanedItem,
    DanglingReference,
    CycleDetected,
    DuplicateContainment,
    MissingTranslation,
}

impl IssueKind {
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::OrphanedItem => "orphaned-item",
            IssueKind::DanglingReference => "dangling-reference",
            IssueKind::CycleDetected => "cycle-detected",
            IssueKind::DuplicateContainment => "duplicate-containment",
            IssueKind::MissingTranslation => "missing-translation",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<TranslatableField>,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            kind,
            message: message.into(),
            link_ids: Vec::new(),
            language: None,
            field: None,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            ..Self::error(kind, message)
        }
    }

    pub fn with_link_id(mut self, link_id: impl Into<String>) -> Self {
        self.link_ids.push(link_id.into());
        self
    }

    pub fn with_link_ids(mut self, link_ids: impl IntoIterator<Item = String>) -> Self {
        self.link_ids.extend(link_ids);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_field(mut self, field: TranslatableField) -> Self {
        self.field = Some(field);
        self
    }

    /// First offending identifier, if the issue names one.
    pub fn link_id(&self) -> Option<&str> {
        self.link_ids.first().map(String::as_str)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.kind, self.message)
    }
}

/// Issues from a validation pass with summary counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let error_count = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Error)
            .count();
        let warning_count = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
            .count();

        Self {
            is_valid: error_count == 0,
            issues,
            error_count,
            warning_count,
        }
    }

    pub fn success() -> Self {
        Self::from_issues(Vec::new())
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.is_valid = self.is_valid && other.is_valid;
    }

    pub fn count_of(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

/// Both validators run against one snapshot, kept apart the way an editor
/// shows them (structure first, translations second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub structure: ValidationResult,
    pub translations: ValidationResult,
    /// Whether any additional language has translated content at all.
    pub has_translations: bool,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.structure.is_valid && self.translations.is_valid
    }

    pub fn into_result(self) -> ValidationResult {
        let mut result = self.structure;
        result.merge(self.translations);
        result
    }
}

pub fn validate_state(state: &TreeState) -> ValidationReport {
    let structure = validate_orphaned_items(&state.order, &state.items, &state.contained);
    let translations =
        validate_translations(&state.order, &state.items, &state.additional_languages);

    ValidationReport {
        structure: ValidationResult::from_issues(structure),
        translations: ValidationResult::from_issues(translations),
        has_translations: crate::types::has_translations(&state.additional_languages),
    }
}
