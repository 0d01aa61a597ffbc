//! Fallback-chain behavior of the resilient config client against a mocked
//! remote API: tier ordering, local-mode switching, and error surfacing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plugadmin::config::storage::CONFIG_KEY;
use plugadmin::{ApiError, ConfigClient, EventBus, LocalStore, MemoryStorage, StorageBackend};

fn client_with(
    base_url: &str,
    proxy_url: Option<String>,
) -> (Arc<ConfigClient>, Arc<MemoryStorage>) {
    let backend = Arc::new(MemoryStorage::new());
    let store = LocalStore::new(Arc::clone(&backend) as Arc<dyn StorageBackend>);
    let client = ConfigClient::new(
        base_url,
        proxy_url,
        Some("test-token".to_string()),
        store,
        EventBus::new(),
    );
    (Arc::new(client), backend)
}

#[tokio::test]
async fn proxy_tier_answers_when_direct_fails_and_store_stays_untouched() {
    let direct = MockServer::start().await;
    let proxy = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&direct)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "endpoint": "/api/config",
            "method": "GET",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "welcomeMessage": "from proxy" })),
        )
        .mount(&proxy)
        .await;

    let (client, backend) = client_with(&direct.uri(), Some(proxy.uri()));
    let doc = client.get_config().await.unwrap();

    assert_eq!(doc.get_str("welcomeMessage"), Some("from proxy"));
    assert!(!client.in_local_mode());
    // The proxy answered, so the local fallback copy was never written.
    assert!(backend.get(CONFIG_KEY).is_none());
}

#[tokio::test]
async fn total_network_failure_saves_locally_with_stamps() {
    // Nothing listens on these ports: both tiers fail with a network error.
    let (client, _backend) = client_with(
        "http://127.0.0.1:9",
        Some("http://127.0.0.1:9".to_string()),
    );

    let before = Utc::now();
    let mut patch = Map::new();
    patch.insert("welcomeMessage".to_string(), Value::String("salut".into()));
    let doc = client.update_config(patch).await.unwrap();
    let after = Utc::now();

    assert!(client.in_local_mode());
    assert!(doc.is_local());
    assert_eq!(doc.get_str("welcomeMessage"), Some("salut"));

    let saved = client.store().load().unwrap();
    assert!(saved.is_local());
    let stamp: DateTime<Utc> = saved
        .get_str(plugadmin::models::LAST_SAVED_KEY)
        .unwrap()
        .parse()
        .unwrap();
    assert!(stamp >= before && stamp <= after);
}

#[tokio::test]
async fn validation_errors_surface_without_touching_the_proxy_or_store() {
    let direct = MockServer::start().await;
    let proxy = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(400).set_body_string("welcomeMessage is required"))
        .mount(&direct)
        .await;

    // A validation failure must not move down the fallback chain.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&proxy)
        .await;

    let (client, backend) = client_with(&direct.uri(), Some(proxy.uri()));
    let err = client.get_config().await.unwrap_err();

    assert!(matches!(err, ApiError::Validation(ref msg) if msg.contains("required")));
    assert!(!client.in_local_mode());
    assert!(backend.get(CONFIG_KEY).is_none());
}

#[tokio::test]
async fn write_retries_via_proxy_with_method_simulation() {
    let direct = MockServer::start().await;
    let proxy = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "welcomeMessage": "old" })),
        )
        .mount(&direct)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&direct)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bot/reload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&direct)
        .await;

    // The proxy only accepts POST; the simulated verb rides in the body.
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "endpoint": "/api/config",
            "method": "POST",
            "data": { "_method": "PUT", "welcomeMessage": "new" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&proxy)
        .await;

    let (client, backend) = client_with(&direct.uri(), Some(proxy.uri()));
    let mut patch = Map::new();
    patch.insert("welcomeMessage".to_string(), Value::String("new".into()));
    let doc = client.update_config(patch).await.unwrap();

    assert_eq!(doc.get_str("welcomeMessage"), Some("new"));
    assert!(!doc.is_local());
    assert!(!client.in_local_mode());
    assert!(backend.get(CONFIG_KEY).is_none());
}

#[tokio::test]
async fn reload_bot_failure_after_successful_write_is_swallowed() {
    let direct = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&direct)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&direct)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bot/reload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&direct)
        .await;

    let (client, _backend) = client_with(&direct.uri(), None);
    let mut patch = Map::new();
    patch.insert("welcomeMessage".to_string(), Value::String("bonjour".into()));

    let doc = client.update_config(patch).await.unwrap();
    assert_eq!(doc.get_str("welcomeMessage"), Some("bonjour"));
    assert!(!client.in_local_mode());
}

#[tokio::test]
async fn vote_returns_the_fresh_like_count() {
    let direct = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/public/plugs/p42/vote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "likes": 12 })))
        .mount(&direct)
        .await;

    let (client, _backend) = client_with(&direct.uri(), None);
    assert_eq!(client.vote("p42").await.unwrap(), 12);
}

#[tokio::test]
async fn upload_image_returns_the_public_url() {
    let direct = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/upload-image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "url": "https://cdn.example.com/banner.jpg" })),
        )
        .mount(&direct)
        .await;

    let (client, _backend) = client_with(&direct.uri(), None);
    let url = client
        .upload_image(vec![0xFF, 0xD8, 0xFF], "banner.jpg")
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example.com/banner.jpg");
}

#[tokio::test]
async fn language_update_notifies_subscribers() {
    let direct = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&direct)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&direct)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bot/reload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&direct)
        .await;

    let (client, _backend) = client_with(&direct.uri(), None);
    let mut languages = client.events().subscribe_language();

    let doc = client
        .update_languages(json!({ "available": ["fr", "en"], "currentLanguage": "en" }))
        .await
        .unwrap();

    assert_eq!(languages.recv().await.unwrap(), "en");
    assert_eq!(
        doc.0.get("languages").and_then(|l| l.get("currentLanguage")),
        Some(&json!("en"))
    );
}

#[tokio::test]
async fn plug_feed_tolerates_both_wire_shapes() {
    let direct = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/public/plugs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plugs": [
                { "id": "p1", "name": "Green Garden", "isVip": true, "likes": 3 },
                { "id": "p2" },
            ]
        })))
        .mount(&direct)
        .await;

    let (client, _backend) = client_with(&direct.uri(), None);
    let plugs = client.get_plugs().await.unwrap();

    assert_eq!(plugs.len(), 2);
    assert!(plugs[0].is_vip);
    assert_eq!(plugs[1].likes, 0);
}
