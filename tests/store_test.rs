//! Local persistence on the real filesystem backend, plus the manual
//! local-to-remote reconciliation against a mocked API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plugadmin::models::LAST_SYNCED_KEY;
use plugadmin::{
    ConfigClient, ConfigDoc, EventBus, FileStorage, LocalStore, StorageBackend, SyncOutcome,
};

fn file_store(dir: &tempfile::TempDir) -> LocalStore {
    let backend = FileStorage::new(dir.path()).unwrap();
    LocalStore::new(Arc::new(backend) as Arc<dyn StorageBackend>)
}

fn client_against(server: &MockServer, store: LocalStore) -> ConfigClient {
    ConfigClient::new(
        server.uri(),
        None,
        Some("test-token".to_string()),
        store,
        EventBus::new(),
    )
}

#[test]
fn documents_survive_process_restarts() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = file_store(&dir);
        store.init().unwrap();
        let mut doc = store.load().unwrap();
        doc.0.insert("welcomeMessage".into(), "persisté".into());
        store.save(&doc).unwrap();
    }

    // A fresh store over the same directory sees the same document.
    let store = file_store(&dir);
    let loaded = store.load().unwrap();
    assert_eq!(loaded.get_str("welcomeMessage"), Some("persisté"));
    assert!(loaded.is_local());
}

#[test]
fn corrupt_file_falls_back_to_absent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("findyourplug_config.json"), "{oops").unwrap();

    let store = file_store(&dir);
    assert!(store.load().is_none());

    // clear recovers by reseeding defaults over the corrupt file.
    store.clear().unwrap();
    assert!(store.load().is_some());
}

#[tokio::test]
async fn reconciliation_pushes_once_and_clears_the_local_flag() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir);

    let mut doc = ConfigDoc::defaults();
    doc.0.insert("welcomeMessage".into(), "édité hors-ligne".into());
    store.save(&doc).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/config"))
        .and(body_partial_json(json!({ "welcomeMessage": "édité hors-ligne" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bot/reload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_against(&server, file_store(&dir));
    assert_eq!(
        store.sync_with_server(&client).await.unwrap(),
        SyncOutcome::Synced
    );

    let synced = store.load().unwrap();
    assert!(!synced.is_local());
    assert!(synced.get_str(LAST_SYNCED_KEY).is_some());

    // Already reconciled: a second run must not touch the network again.
    assert_eq!(
        store.sync_with_server(&client).await.unwrap(),
        SyncOutcome::AlreadySynced
    );
}

#[tokio::test]
async fn failed_reconciliation_keeps_the_local_copy_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir);

    let mut doc = ConfigDoc::defaults();
    doc.0.insert("welcomeMessage".into(), "toujours local".into());
    store.save(&doc).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_against(&server, file_store(&dir));
    assert_eq!(
        store.sync_with_server(&client).await.unwrap(),
        SyncOutcome::NotSynced
    );

    let kept = store.load().unwrap();
    assert!(kept.is_local());
    assert_eq!(kept.get_str("welcomeMessage"), Some("toujours local"));
}

#[tokio::test]
async fn unflagged_documents_are_never_pushed() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir);
    store.init().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_against(&server, file_store(&dir));
    assert_eq!(
        store.sync_with_server(&client).await.unwrap(),
        SyncOutcome::AlreadySynced
    );
}
