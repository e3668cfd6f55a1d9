use octofhir_questionnaire::converter::{ADDITIONAL_LANGUAGE_URL, TRANSLATION_URL};
use octofhir_questionnaire::*;
use serde_json::{Value, json};
use std::sync::Arc;

#[allow(dead_code)]
pub fn translation(language: &str, content: &str) -> Value {
    json!({
        "extension": [{
            "url": TRANSLATION_URL,
            "extension": [
                { "url": "lang", "valueCode": language },
                { "url": "content", "valueString": content }
            ]
        }]
    })
}

/// Two-language intake form: a group with a choice and a conditional string
/// question, a coded question bound to a contained value set, and a closing
/// display item.
#[allow(dead_code)]
pub fn intake_document() -> Value {
    json!({
        "resourceType": "Questionnaire",
        "id": "intake",
        "url": "http://example.org/Questionnaire/intake",
        "name": "intake",
        "title": "Innkomst",
        "_title": translation("en-GB", "Intake"),
        "version": "3",
        "status": "active",
        "language": "nb-NO",
        "copyright": "Example Clinic",
        "extension": [
            { "url": ADDITIONAL_LANGUAGE_URL, "valueCode": "en-GB" }
        ],
        "contained": [{
            "resourceType": "ValueSet",
            "id": "vs-1",
            "status": "active",
            "expansion": { "contains": [
                { "system": "http://example.org/colour", "code": "r", "display": "Rød" }
            ]}
        }],
        "item": [
            {
                "linkId": "g",
                "type": "group",
                "text": "Om deg",
                "_text": translation("en-GB", "About you"),
                "item": [
                    {
                        "linkId": "smoker",
                        "type": "choice",
                        "text": "Røyker du?",
                        "_text": translation("en-GB", "Do you smoke?"),
                        "answerOption": [
                            { "valueCoding": {
                                "code": "y", "display": "Ja",
                                "_display": translation("en-GB", "Yes")
                            }},
                            { "valueCoding": {
                                "code": "n", "display": "Nei",
                                "_display": translation("en-GB", "No")
                            }}
                        ]
                    },
                    {
                        "linkId": "amount",
                        "type": "integer",
                        "text": "Hvor mye?",
                        "_text": translation("en-GB", "How much?"),
                        "enableWhen": [{
                            "question": "smoker",
                            "operator": "=",
                            "answerCoding": { "code": "y" }
                        }]
                    }
                ]
            },
            {
                "linkId": "colour",
                "type": "choice",
                "text": "Farge",
                "_text": translation("en-GB", "Colour"),
                "answerValueSet": "#vs-1"
            },
            {
                "linkId": "thanks",
                "type": "display",
                "text": "Takk",
                "_text": translation("en-GB", "Thanks")
            }
        ]
    })
}

#[allow(dead_code)]
pub fn intake_state() -> TreeState {
    import_questionnaire(&intake_document()).unwrap()
}

/// Group `root` with `count` string questions, all in one language.
#[allow(dead_code)]
pub fn flat_state(count: usize) -> TreeState {
    let mut state = TreeState::new(Some("en".into()));
    state
        .items
        .insert("root".into(), Item::new("root", ItemType::Group).with_text("Root"));
    state.order.insert(None, None, "root");
    for i in 0..count {
        let id = format!("q{i}");
        state
            .items
            .insert(id.clone(), Item::new(id.as_str(), ItemType::String).with_text(format!("Question {i}")));
        state.order.insert(Some("root"), None, id);
    }
    state
}

#[allow(dead_code)]
pub async fn memory_session(gateway: &MemoryGateway) -> EditorSession {
    gateway.insert_document("intake", intake_document()).await;
    EditorSession::new(
        SessionConfig::new("session-key", "intake").with_locale("nb-NO"),
        Arc::new(gateway.clone()),
    )
    .unwrap()
}
