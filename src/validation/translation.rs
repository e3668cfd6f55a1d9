//! Completeness of additional-language translations.

use super::{IssueKind, ValidationIssue};
use crate::types::{Item, Items, Languages, OrderIndex, TranslatableField};

/// Fields of `item` that carry default-language text and therefore need a
/// translation in every started language.
pub fn translatable_fields(item: &Item) -> Vec<TranslatableField> {
    let has_text = |value: Option<&str>| value.is_some_and(|v| !v.trim().is_empty());

    let mut fields = Vec::new();
    if has_text(item.text.as_deref()) {
        fields.push(TranslatableField::Text);
    }
    if has_text(item.prefix.as_deref()) {
        fields.push(TranslatableField::Prefix);
    }
    for option in &item.answer_option {
        if let (Some(code), true) = (option.code(), has_text(option.label())) {
            fields.push(TranslatableField::AnswerOption(code.to_string()));
        }
    }
    fields
}

/// Report every reachable item field lacking a translation.
///
/// Languages without a single translated key are skipped: they count as
/// "not started" rather than entirely missing. This is a product policy and
/// may be revisited.
pub fn validate_translations(
    order: &OrderIndex,
    items: &Items,
    languages: &Languages,
) -> Vec<ValidationIssue> {
    let mut codes: Vec<&String> = languages.keys().collect();
    codes.sort();

    let reachable = order.preorder();
    let mut issues = Vec::new();

    for code in codes {
        let translation = &languages[code];
        if translation.is_empty() {
            tracing::debug!(language = %code, "skipping language without translations");
            continue;
        }

        for link_id in &reachable {
            let Some(item) = items.get(link_id) else {
                continue;
            };
            for field in translatable_fields(item) {
                let translated = translation
                    .get(link_id, &field)
                    .is_some_and(|value| !value.trim().is_empty());
                if translated {
                    continue;
                }
                issues.push(
                    ValidationIssue::error(
                        IssueKind::MissingTranslation,
                        format!("Item '{link_id}' has no {code} translation for {field}"),
                    )
                    .with_link_id(link_id.clone())
                    .with_language(code.clone())
                    .with_field(field),
                );
            }
        }
    }

    issues
}
