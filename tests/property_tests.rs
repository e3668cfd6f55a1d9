//! Property-based tests for the editing engine.
//!
//! Trees are grown through the reducer from random edit scripts, so every
//! generated state is one a user could actually reach.

use octofhir_questionnaire::*;
use proptest::prelude::*;
use std::collections::HashSet;

/// One step of a generated edit script.
#[derive(Debug, Clone)]
enum Step {
    /// Add an item under the `parent`-th container seen so far (or at root).
    Add { parent: usize, group: bool, text: String },
    /// Translate the `target`-th item into the `language`-th language.
    Translate { target: usize, language: usize, text: String },
}

const LANGUAGES: [&str; 3] = ["de", "sv", "fr"];

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0usize..64, any::<bool>(), "[A-Z][a-z]{2,12}\\??")
            .prop_map(|(parent, group, text)| Step::Add { parent, group, text }),
        1 => (0usize..64, 0usize..LANGUAGES.len(), "[A-Z][a-z]{2,12}")
            .prop_map(|(target, language, text)| Step::Translate { target, language, text }),
    ]
}

/// Replay `steps` through the reducer on a fresh questionnaire.
fn build_state(steps: &[Step], languages: usize) -> TreeState {
    let mut state = TreeState::new(Some("en".into()));
    for code in LANGUAGES.iter().take(languages) {
        state = apply(&state, Action::AddLanguage { code: (*code).into() }).unwrap();
    }

    let mut containers: Vec<String> = Vec::new();
    let mut ids: Vec<String> = Vec::new();
    for (n, step) in steps.iter().enumerate() {
        match step {
            Step::Add { parent, group, text } => {
                // slot 0 means "at root"
                let parent = match parent % (containers.len() + 1) {
                    0 => None,
                    i => Some(containers[i - 1].clone()),
                };
                let link_id = format!("n{n}");
                let item_type = if *group { ItemType::Group } else { ItemType::String };
                state = apply(
                    &state,
                    Action::AddItem {
                        parent,
                        index: None,
                        item_type,
                        text: Some(text.clone()),
                        link_id: Some(link_id.clone()),
                    },
                )
                .unwrap();
                if *group {
                    containers.push(link_id.clone());
                }
                ids.push(link_id);
            }
            Step::Translate {
                target,
                language,
                text,
            } => {
                if ids.is_empty() || languages == 0 {
                    continue;
                }
                state = apply(
                    &state,
                    Action::SetItemTranslation {
                        language: LANGUAGES[language % languages].into(),
                        link_id: ids[target % ids.len()].clone(),
                        field: TranslatableField::Text,
                        value: Some(text.clone()),
                    },
                )
                .unwrap();
            }
        }
    }
    state
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Export then import gives back the same content.
    #[test]
    fn prop_export_import_round_trip(
        steps in prop::collection::vec(step(), 0..40),
        languages in 0usize..=LANGUAGES.len(),
    ) {
        let state = build_state(&steps, languages);
        let document = export_questionnaire(&state).unwrap();
        let reimported = import_questionnaire(&document).unwrap();

        prop_assert!(reimported.same_content(&state));
        prop_assert!(!reimported.is_dirty);
    }

    /// Trees built by the reducer never carry structural issues.
    #[test]
    fn prop_reducer_keeps_structure_valid(steps in prop::collection::vec(step(), 0..40)) {
        let state = build_state(&steps, 0);
        let issues = validate_orphaned_items(&state.order, &state.items, &state.contained);
        prop_assert!(issues.is_empty(), "{:?}", issues);
    }

    /// After detaching arbitrary items every stored item is either reachable
    /// from the roots or reported as orphaned exactly once.
    #[test]
    fn prop_every_item_reachable_or_reported_once(
        steps in prop::collection::vec(step(), 1..40),
        detach in prop::collection::vec(0usize..64, 0..6),
    ) {
        let mut state = build_state(&steps, 0);
        let ids: Vec<String> = state.items.keys().cloned().collect();
        if !ids.is_empty() {
            for pick in &detach {
                state.order.detach(&ids[pick % ids.len()]);
            }
        }

        let reachable: HashSet<String> = state.order.preorder().into_iter().collect();
        let issues = validate_orphaned_items(&state.order, &state.items, &state.contained);
        let orphans: Vec<&str> = issues
            .iter()
            .filter(|issue| issue.kind == IssueKind::OrphanedItem)
            .filter_map(ValidationIssue::link_id)
            .collect();
        let reported: HashSet<&str> = orphans.iter().copied().collect();

        prop_assert_eq!(orphans.len(), reported.len());
        for id in state.items.keys() {
            prop_assert!(
                reachable.contains(id) != reported.contains(id.as_str()),
                "item {} reachable={} reported={}",
                id,
                reachable.contains(id),
                reported.contains(id.as_str())
            );
        }
    }
}
