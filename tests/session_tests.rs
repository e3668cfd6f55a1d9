mod common;

use octofhir_questionnaire::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_load_edit_save_cycle() {
    let gateway = MemoryGateway::new();
    let session = common::memory_session(&gateway).await;

    let state = session.load().await.unwrap();
    assert_eq!(state.items.len(), 5);
    assert!(!state.is_dirty);

    session
        .dispatch(Action::UpdateMetadata {
            change: MetadataField::Version(Some("4".into())),
        })
        .await
        .unwrap();
    assert!(session.snapshot().await.is_dirty);

    let receipt = session.save().await.unwrap();
    assert!(receipt.marked_saved);
    let state = session.snapshot().await;
    assert!(!state.is_dirty);
    assert_eq!(state.saved_at, Some(receipt.saved_at));

    let stored = gateway.document("intake").await.unwrap();
    assert_eq!(stored["version"], "4");
    assert_eq!(gateway.save_count().await, 1);
}

#[tokio::test]
async fn test_failed_save_leaves_state_identical() {
    let gateway = MemoryGateway::new();
    let session = common::memory_session(&gateway).await;
    session.load().await.unwrap();
    session
        .dispatch(Action::add_item(Some("g"), ItemType::Text, "Anything else?"))
        .await
        .unwrap();

    let before = session.fingerprint().await.unwrap();
    let snapshot = session.snapshot().await;

    gateway
        .fail_next_save(GatewayError::unavailable("connection reset"))
        .await;
    let err = session.save().await.unwrap_err();
    assert!(matches!(
        err,
        QuestionnaireError::Gateway(GatewayError::ServerUnavailable { .. })
    ));

    let after = session.fingerprint().await.unwrap();
    assert!(before.matches(&after));
    assert!(Arc::ptr_eq(&snapshot, &session.snapshot().await));
    assert!(session.snapshot().await.is_dirty);
}

#[tokio::test]
async fn test_failed_load_keeps_unsaved_edits() {
    let gateway = MemoryGateway::new();
    let session = common::memory_session(&gateway).await;
    session.load().await.unwrap();
    session
        .dispatch(Action::RemoveItem {
            link_id: "thanks".into(),
        })
        .await
        .unwrap();
    let edited = session.snapshot().await;

    gateway.fail_next_load(GatewayError::Unauthorized).await;
    let err = session.load().await.unwrap_err();
    assert!(matches!(err, QuestionnaireError::Gateway(GatewayError::Unauthorized)));
    assert!(Arc::ptr_eq(&edited, &session.snapshot().await));
}

#[tokio::test]
async fn test_malformed_backend_document_is_not_applied() {
    let gateway = MemoryGateway::new();
    let session = common::memory_session(&gateway).await;
    session.load().await.unwrap();
    let loaded = session.snapshot().await;

    gateway
        .insert_document(
            "intake",
            serde_json::json!({ "resourceType": "Questionnaire", "item": [ { "type": "string" } ] }),
        )
        .await;
    let err = session.load().await.unwrap_err();
    match err {
        QuestionnaireError::Import(e) => assert_eq!(e.path, "Questionnaire.item[0].linkId"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(Arc::ptr_eq(&loaded, &session.snapshot().await));
}

#[tokio::test]
async fn test_string_encoded_backend() {
    let gateway = MemoryGateway::new().string_encoded();
    let session = common::memory_session(&gateway).await;
    let state = session.load().await.unwrap();
    assert_eq!(state.default_language(), Some("nb-NO"));
}

#[tokio::test]
async fn test_rejected_session_key() {
    let gateway = MemoryGateway::new();
    gateway.allow_session("someone-else").await;
    let session = common::memory_session(&gateway).await;

    let err = session.load().await.unwrap_err();
    assert!(matches!(err, QuestionnaireError::Gateway(GatewayError::Unauthorized)));
}

#[tokio::test]
async fn test_save_while_another_is_pending_is_rejected() {
    let gateway = MemoryGateway::new().with_latency(Duration::from_millis(200));
    let session = Arc::new(common::memory_session(&gateway).await);
    session.load().await.unwrap();

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.save().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = session.save().await;
    assert!(matches!(second, Err(QuestionnaireError::SaveInProgress)));
    assert!(first.await.unwrap().is_ok());
    assert_eq!(gateway.save_count().await, 1);
}

#[tokio::test]
async fn test_messages_and_file_name() {
    let gateway = MemoryGateway::new();
    let mut messages = HashMap::new();
    messages.insert("save".to_string(), "Lagre".to_string());
    gateway.insert_messages("nb-NO", messages).await;

    let session = common::memory_session(&gateway).await;
    session.load().await.unwrap();

    assert_eq!(session.load_messages().await.unwrap()["save"], "Lagre");
    assert_eq!(session.file_name().await, "intake-v3");
    assert!(session.validate().await.is_valid());
}

#[tokio::test]
async fn test_export_and_validate_current_snapshot() {
    let gateway = MemoryGateway::new();
    let session = common::memory_session(&gateway).await;
    session.load().await.unwrap();

    assert_eq!(session.export().await.unwrap(), common::intake_document());
    assert!(session.validate().await.is_valid());

    session
        .dispatch(Action::RemoveItem {
            link_id: "colour".into(),
        })
        .await
        .unwrap();
    let exported = session.export().await.unwrap();
    assert_eq!(exported["item"].as_array().unwrap().len(), 2);
}
