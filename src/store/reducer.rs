//! Pure state transitions: `apply(state, action) -> state | error`.
//!
//! Every transition works on a clone of the input snapshot, so a rejected
//! action can never leave a half-applied state behind.

use std::collections::{HashMap, HashSet};

use super::actions::{Action, ItemField, MetadataField};
use super::state::TreeState;
use crate::error::{DispatchError, ReferenceKind};
use crate::types::{
    AnswerOption, ContainedResource, Item, ItemType, MetadataTranslationField, TranslatableField,
    is_valid_language_code,
};

/// Fresh identifier for a new item.
pub fn mint_link_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn apply(state: &TreeState, action: Action) -> Result<TreeState, DispatchError> {
    let clears_dirty = matches!(
        action,
        Action::NewQuestionnaire { .. } | Action::ResetQuestionnaire { .. } | Action::MarkSaved { .. }
    );
    let mut next = state.clone();
    mutate(&mut next, action)?;
    if !clears_dirty {
        next.is_dirty = true;
    }
    Ok(next)
}

fn mutate(state: &mut TreeState, action: Action) -> Result<(), DispatchError> {
    match action {
        Action::NewQuestionnaire { language } => {
            if let Some(code) = &language {
                ensure_language_code(code)?;
            }
            *state = TreeState::new(language);
            Ok(())
        }
        Action::ResetQuestionnaire { state: replacement } => {
            *state = *replacement;
            Ok(())
        }
        Action::MarkSaved { at } => {
            state.is_dirty = false;
            state.saved_at = Some(at);
            Ok(())
        }
        Action::AddItem {
            parent,
            index,
            item_type,
            text,
            link_id,
        } => add_item(state, parent.as_deref(), index, item_type, text, link_id),
        Action::RemoveItem { link_id } => remove_item(state, &link_id),
        Action::MoveItem {
            link_id,
            new_parent,
            index,
        } => move_item(state, &link_id, new_parent.as_deref(), index),
        Action::DuplicateItem { link_id } => duplicate_item(state, &link_id),
        Action::UpdateItem { link_id, change } => update_item(state, &link_id, change),
        Action::UpdateLinkId {
            old_link_id,
            new_link_id,
        } => update_link_id(state, &old_link_id, &new_link_id),
        Action::UpdateMetadata { change } => {
            update_metadata(state, change);
            Ok(())
        }
        Action::SetDefaultLanguage { code } => set_default_language(state, code),
        Action::AddLanguage { code } => add_language(state, code),
        Action::RemoveLanguage { code } => state
            .additional_languages
            .remove(&code)
            .map(|_| ())
            .ok_or_else(|| DispatchError::language_not_found(code)),
        Action::SetItemTranslation {
            language,
            link_id,
            field,
            value,
        } => set_item_translation(state, &language, &link_id, &field, value),
        Action::SetMetadataTranslation {
            language,
            field,
            value,
        } => set_metadata_translation(state, &language, field, value),
        Action::AddContained { resource } => add_contained(state, resource),
        Action::RemoveContained { id } => {
            let position = state
                .contained
                .iter()
                .position(|resource| resource.id == id)
                .ok_or(DispatchError::ReferenceNotFound {
                    kind: ReferenceKind::ContainedResource,
                    id,
                })?;
            state.contained.remove(position);
            Ok(())
        }
    }
}

fn ensure_language_code(code: &str) -> Result<(), DispatchError> {
    if is_valid_language_code(code) {
        Ok(())
    } else {
        Err(DispatchError::InvalidLanguageCode {
            code: code.to_string(),
        })
    }
}

fn require_item<'a>(state: &'a TreeState, link_id: &str) -> Result<&'a Item, DispatchError> {
    state
        .item(link_id)
        .ok_or_else(|| DispatchError::item_not_found(link_id))
}

fn require_container(state: &TreeState, parent: &str) -> Result<(), DispatchError> {
    let item = require_item(state, parent)?;
    if item.item_type.can_have_children() {
        Ok(())
    } else {
        Err(DispatchError::invalid_structure(format!(
            "{} item '{parent}' cannot contain other items",
            item.item_type
        )))
    }
}

fn add_item(
    state: &mut TreeState,
    parent: Option<&str>,
    index: Option<usize>,
    item_type: ItemType,
    text: Option<String>,
    link_id: Option<String>,
) -> Result<(), DispatchError> {
    let link_id = link_id.unwrap_or_else(mint_link_id);
    if link_id.trim().is_empty() {
        return Err(DispatchError::InvalidPayload {
            message: "linkId must not be empty".to_string(),
        });
    }
    if state.has_item(&link_id) {
        return Err(DispatchError::DuplicateLinkId { link_id });
    }
    if let Some(parent) = parent {
        require_container(state, parent)?;
    }

    let mut item = Item::new(link_id.clone(), item_type);
    item.text = text;
    state.order.insert(parent, index, link_id.clone());
    state.items.insert(link_id, item);
    Ok(())
}

fn remove_item(state: &mut TreeState, link_id: &str) -> Result<(), DispatchError> {
    require_item(state, link_id)?;

    let removed = state.order.remove_subtree(link_id);
    for id in &removed {
        state.items.remove(id);
        for translation in state.additional_languages.values_mut() {
            translation.items.remove(id);
        }
    }

    // enableWhen may only name existing items.
    let removed_ids: HashSet<&str> = removed.iter().map(String::as_str).collect();
    let mut pruned = 0;
    for item in state.items.values_mut() {
        let before = item.enable_when.len();
        item.enable_when
            .retain(|condition| !removed_ids.contains(condition.question.as_str()));
        pruned += before - item.enable_when.len();
        if item.enable_when.is_empty() {
            item.enable_behavior = None;
        }
    }
    tracing::debug!(link_id, removed = removed.len(), pruned, "removed item subtree");
    Ok(())
}

fn move_item(
    state: &mut TreeState,
    link_id: &str,
    new_parent: Option<&str>,
    index: usize,
) -> Result<(), DispatchError> {
    require_item(state, link_id)?;
    if let Some(parent) = new_parent {
        require_container(state, parent)?;
        if parent == link_id || state.order.is_descendant(link_id, parent) {
            return Err(DispatchError::invalid_structure(format!(
                "moving '{link_id}' under '{parent}' would create a cycle"
            )));
        }
    }

    state.order.detach(link_id);
    state.order.insert(new_parent, Some(index), link_id);
    Ok(())
}

fn duplicate_item(state: &mut TreeState, link_id: &str) -> Result<(), DispatchError> {
    require_item(state, link_id)?;

    let mut subtree = vec![link_id.to_string()];
    subtree.extend(state.order.descendants(link_id));
    let renamed: HashMap<String, String> = subtree
        .iter()
        .map(|old| (old.clone(), mint_link_id()))
        .collect();

    for old in &subtree {
        let (Some(source), Some(new_id)) = (state.items.get(old), renamed.get(old)) else {
            continue;
        };
        let mut copy = source.clone();
        copy.link_id = new_id.clone();
        for condition in &mut copy.enable_when {
            if let Some(target) = renamed.get(&condition.question) {
                condition.question = target.clone();
            }
        }
        state.items.insert(new_id.clone(), copy);

        let children: Vec<String> = state
            .order
            .children_of(old)
            .iter()
            .filter_map(|child| renamed.get(child).cloned())
            .collect();
        if !children.is_empty() {
            state.order.children.insert(new_id.clone(), children);
        }

        for translation in state.additional_languages.values_mut() {
            if let Some(entry) = translation.items.get(old).cloned() {
                translation.items.insert(new_id.clone(), entry);
            }
        }
    }

    if let (Some(slot), Some(copy_id)) = (state.order.slot_after(link_id), renamed.get(link_id)) {
        state
            .order
            .insert(slot.parent.as_deref(), Some(slot.index), copy_id.clone());
    }
    Ok(())
}

fn update_item(
    state: &mut TreeState,
    link_id: &str,
    change: ItemField,
) -> Result<(), DispatchError> {
    require_item(state, link_id)?;

    if let ItemField::Type(item_type) = &change {
        if !item_type.can_have_children() && !state.order.children_of(link_id).is_empty() {
            return Err(DispatchError::invalid_structure(format!(
                "'{link_id}' has child items and cannot become {item_type}"
            )));
        }
    }
    if let ItemField::EnableWhen(conditions) = &change {
        if let Some(missing) = conditions.iter().find(|c| !state.has_item(&c.question)) {
            return Err(DispatchError::item_not_found(missing.question.as_str()));
        }
    }
    if let ItemField::AnswerOptions(options) = &change {
        prune_option_translations(state, link_id, options);
    }

    let Some(item) = state.items.get_mut(link_id) else {
        return Err(DispatchError::item_not_found(link_id));
    };
    match change {
        ItemField::Text(text) => item.text = text,
        ItemField::Prefix(prefix) => item.prefix = prefix,
        ItemField::Definition(definition) => item.definition = definition,
        ItemField::Type(item_type) => item.item_type = item_type,
        ItemField::Required(required) => item.required = required,
        ItemField::Repeats(repeats) => item.repeats = repeats,
        ItemField::ReadOnly(read_only) => item.read_only = read_only,
        ItemField::MaxLength(max_length) => item.max_length = max_length,
        ItemField::EnableWhen(conditions) => item.enable_when = conditions,
        ItemField::EnableBehavior(behavior) => item.enable_behavior = behavior,
        ItemField::AnswerValueSet(reference) => item.answer_value_set = reference,
        ItemField::AnswerOptions(options) => item.answer_option = options,
    }
    Ok(())
}

/// Drop option translations whose code no longer exists on the item.
fn prune_option_translations(state: &mut TreeState, link_id: &str, options: &[AnswerOption]) {
    let codes: HashSet<&str> = options.iter().filter_map(AnswerOption::code).collect();
    for translation in state.additional_languages.values_mut() {
        if let Some(entry) = translation.items.get_mut(link_id) {
            entry.answer_options.retain(|code, _| codes.contains(code.as_str()));
            if entry.is_empty() {
                translation.items.remove(link_id);
            }
        }
    }
}

fn update_link_id(state: &mut TreeState, old: &str, new: &str) -> Result<(), DispatchError> {
    require_item(state, old)?;
    if new.trim().is_empty() {
        return Err(DispatchError::InvalidPayload {
            message: "linkId must not be empty".to_string(),
        });
    }
    if old == new {
        return Ok(());
    }
    if state.has_item(new) {
        return Err(DispatchError::DuplicateLinkId {
            link_id: new.to_string(),
        });
    }

    if let Some(mut item) = state.items.remove(old) {
        item.link_id = new.to_string();
        state.items.insert(new.to_string(), item);
    }
    state.order.rename(old, new);
    for translation in state.additional_languages.values_mut() {
        if let Some(entry) = translation.items.remove(old) {
            translation.items.insert(new.to_string(), entry);
        }
    }
    for item in state.items.values_mut() {
        for condition in &mut item.enable_when {
            if condition.question == old {
                condition.question = new.to_string();
            }
        }
    }
    Ok(())
}

fn update_metadata(state: &mut TreeState, change: MetadataField) {
    let metadata = &mut state.metadata;
    match change {
        MetadataField::Id(id) => metadata.id = id,
        MetadataField::Url(url) => metadata.url = url,
        MetadataField::Name(name) => metadata.name = name,
        MetadataField::Title(title) => metadata.title = title,
        MetadataField::Version(version) => metadata.version = version,
        MetadataField::Status(status) => metadata.status = status,
        MetadataField::Date(date) => metadata.date = date,
        MetadataField::Publisher(publisher) => metadata.publisher = publisher,
        MetadataField::Description(description) => metadata.description = description,
    }
}

fn set_default_language(state: &mut TreeState, code: String) -> Result<(), DispatchError> {
    ensure_language_code(&code)?;
    if state.additional_languages.contains_key(&code) {
        return Err(DispatchError::LanguageConflict { code });
    }
    state.metadata.language = Some(code);
    Ok(())
}

fn add_language(state: &mut TreeState, code: String) -> Result<(), DispatchError> {
    ensure_language_code(&code)?;
    if state.default_language() == Some(code.as_str()) {
        return Err(DispatchError::LanguageConflict { code });
    }
    state.additional_languages.entry(code).or_default();
    Ok(())
}

fn set_item_translation(
    state: &mut TreeState,
    language: &str,
    link_id: &str,
    field: &TranslatableField,
    value: Option<String>,
) -> Result<(), DispatchError> {
    let item = require_item(state, link_id)?;
    if let TranslatableField::AnswerOption(code) = field {
        if !item.has_option_code(code) {
            return Err(DispatchError::ReferenceNotFound {
                kind: ReferenceKind::AnswerOption,
                id: code.clone(),
            });
        }
    }
    let translation = state
        .additional_languages
        .get_mut(language)
        .ok_or_else(|| DispatchError::language_not_found(language))?;
    translation.set(link_id, field, value);
    Ok(())
}

fn set_metadata_translation(
    state: &mut TreeState,
    language: &str,
    field: MetadataTranslationField,
    value: Option<String>,
) -> Result<(), DispatchError> {
    let translation = state
        .additional_languages
        .get_mut(language)
        .ok_or_else(|| DispatchError::language_not_found(language))?;
    translation.metadata.set(field, value);
    Ok(())
}

fn add_contained(state: &mut TreeState, resource: ContainedResource) -> Result<(), DispatchError> {
    if resource.id.trim().is_empty() {
        return Err(DispatchError::InvalidPayload {
            message: "contained resource id must not be empty".to_string(),
        });
    }
    match state.contained.iter_mut().find(|existing| existing.id == resource.id) {
        Some(existing) => *existing = resource,
        None => state.contained.push(resource),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnswerOption, EnableBehavior, EnableWhen, EnableWhenOperator};

    fn add(state: &TreeState, parent: Option<&str>, id: &str, item_type: ItemType) -> TreeState {
        apply(
            state,
            Action::AddItem {
                parent: parent.map(str::to_string),
                index: None,
                item_type,
                text: Some(format!("Text {id}")),
                link_id: Some(id.to_string()),
            },
        )
        .unwrap()
    }

    fn sample() -> TreeState {
        let state = TreeState::new(Some("nb-NO".into()));
        let state = add(&state, None, "g", ItemType::Group);
        let state = add(&state, Some("g"), "q1", ItemType::Choice);
        let state = add(&state, Some("g"), "q2", ItemType::String);
        add(&state, None, "info", ItemType::Display)
    }

    #[test]
    fn test_add_item_mints_fresh_ids() {
        let state = TreeState::new(None);
        let first = apply(&state, Action::add_item(None, ItemType::String, "A")).unwrap();
        let second = apply(&state, Action::add_item(None, ItemType::String, "A")).unwrap();
        assert_eq!(first.order.roots.len(), 1);
        assert_ne!(first.order.roots[0], second.order.roots[0]);
        assert!(first.is_dirty);
    }

    #[test]
    fn test_add_under_display_is_rejected() {
        let state = sample();
        let err = apply(&state, Action::add_item(Some("info"), ItemType::String, "x")).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidStructure { .. }));
    }

    #[test]
    fn test_missing_reference_leaves_state_untouched() {
        let state = sample();
        let before = state.clone();
        let err = apply(
            &state,
            Action::update_item("nope", ItemField::Text(Some("x".into()))),
        )
        .unwrap_err();
        assert_eq!(err, DispatchError::item_not_found("nope"));
        assert_eq!(state, before);
    }

    #[test]
    fn test_move_into_own_descendant_is_rejected() {
        let state = sample();
        let err = apply(
            &state,
            Action::MoveItem {
                link_id: "g".into(),
                new_parent: Some("q1".into()),
                index: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidStructure { .. }));
    }

    #[test]
    fn test_move_reorders_without_duplication() {
        let state = sample();
        let moved = apply(
            &state,
            Action::MoveItem {
                link_id: "q2".into(),
                new_parent: None,
                index: 0,
            },
        )
        .unwrap();
        assert_eq!(moved.order.roots, vec!["q2", "g", "info"]);
        assert_eq!(moved.order.children_of("g"), ["q1"]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let state = sample();
        let action = Action::update_item("q2", ItemField::Required(Some(true)));
        let once = apply(&state, action.clone()).unwrap();
        let twice = apply(&once, action).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rename_propagates_to_enable_when_and_translations() {
        let state = sample();
        let state = apply(
            &state,
            Action::update_item(
                "q2",
                ItemField::EnableWhen(vec![
                    EnableWhen::new("q1", EnableWhenOperator::Exists).with_answer_boolean(true),
                ]),
            ),
        )
        .unwrap();
        let state = apply(&state, Action::AddLanguage { code: "en-GB".into() }).unwrap();
        let state = apply(
            &state,
            Action::SetItemTranslation {
                language: "en-GB".into(),
                link_id: "q1".into(),
                field: TranslatableField::Text,
                value: Some("Question".into()),
            },
        )
        .unwrap();

        let renamed = apply(
            &state,
            Action::UpdateLinkId {
                old_link_id: "q1".into(),
                new_link_id: "colour".into(),
            },
        )
        .unwrap();

        assert!(renamed.has_item("colour"));
        assert!(!renamed.has_item("q1"));
        assert_eq!(renamed.order.children_of("g"), ["colour", "q2"]);
        assert_eq!(renamed.items["q2"].enable_when[0].question, "colour");
        assert_eq!(
            renamed.additional_languages["en-GB"].get("colour", &TranslatableField::Text),
            Some("Question")
        );
    }

    #[test]
    fn test_enable_when_on_unknown_item_is_rejected() {
        let state = sample();
        let err = apply(
            &state,
            Action::update_item(
                "q2",
                ItemField::EnableWhen(vec![EnableWhen::new("ghost", EnableWhenOperator::Exists)]),
            ),
        )
        .unwrap_err();
        assert_eq!(err, DispatchError::item_not_found("ghost"));
        assert!(state.items["q2"].enable_when.is_empty());
    }

    #[test]
    fn test_remove_drops_conditions_on_removed_items() {
        let state = add(&sample(), None, "a", ItemType::Boolean);
        let state = apply(
            &state,
            Action::update_item(
                "q2",
                ItemField::EnableWhen(vec![
                    EnableWhen::new("a", EnableWhenOperator::Exists).with_answer_boolean(true),
                    EnableWhen::new("q1", EnableWhenOperator::Exists).with_answer_boolean(true),
                ]),
            ),
        )
        .unwrap();
        let state = apply(
            &state,
            Action::update_item("q2", ItemField::EnableBehavior(Some(EnableBehavior::All))),
        )
        .unwrap();

        let state = apply(&state, Action::RemoveItem { link_id: "a".into() }).unwrap();
        let conditions = &state.items["q2"].enable_when;
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].question, "q1");
        assert_eq!(state.items["q2"].enable_behavior, Some(EnableBehavior::All));

        let state = apply(&state, Action::RemoveItem { link_id: "q1".into() }).unwrap();
        assert!(state.items["q2"].enable_when.is_empty());
        assert_eq!(state.items["q2"].enable_behavior, None);
    }

    #[test]
    fn test_duplicate_copies_subtree_after_original() {
        let state = sample();
        let copied = apply(&state, Action::DuplicateItem { link_id: "g".into() }).unwrap();
        assert_eq!(copied.order.roots.len(), 3);
        assert_eq!(copied.order.roots[0], "g");
        let copy_id = &copied.order.roots[1];
        assert_ne!(copy_id, "g");
        assert_eq!(copied.order.children_of(copy_id).len(), 2);
        assert_eq!(copied.items.len(), 7);
    }

    #[test]
    fn test_answer_option_change_prunes_translations() {
        let state = sample();
        let state = apply(
            &state,
            Action::update_item(
                "q1",
                ItemField::AnswerOptions(vec![
                    AnswerOption::coding("y", "Ja"),
                    AnswerOption::coding("n", "Nei"),
                ]),
            ),
        )
        .unwrap();
        let state = apply(&state, Action::AddLanguage { code: "en-GB".into() }).unwrap();
        let state = apply(
            &state,
            Action::SetItemTranslation {
                language: "en-GB".into(),
                link_id: "q1".into(),
                field: TranslatableField::AnswerOption("n".into()),
                value: Some("No".into()),
            },
        )
        .unwrap();

        let state = apply(
            &state,
            Action::update_item(
                "q1",
                ItemField::AnswerOptions(vec![AnswerOption::coding("y", "Ja")]),
            ),
        )
        .unwrap();
        assert!(state.additional_languages["en-GB"].is_empty());
    }

    #[test]
    fn test_default_language_cannot_be_additional() {
        let state = sample();
        let err = apply(&state, Action::AddLanguage { code: "nb-NO".into() }).unwrap_err();
        assert_eq!(err, DispatchError::LanguageConflict { code: "nb-NO".into() });
    }

    #[test]
    fn test_mark_saved_clears_dirty_flag() {
        let state = sample();
        assert!(state.is_dirty);
        let at = chrono::Utc::now();
        let saved = apply(&state, Action::MarkSaved { at }).unwrap();
        assert!(!saved.is_dirty);
        assert_eq!(saved.saved_at, Some(at));
        assert!(saved.same_content(&state));
    }
}
