use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::config;
use crate::errors::ApiError;
use crate::events::EventBus;
use crate::models::TelegramLinks;
use crate::store::{load_cached_links, store_cached_links, StorageBackend};

/// Background refresher for the two outbound Telegram URLs.
///
/// Public shop pages need these links on every render; polling a narrow
/// public endpoint keeps them fresh without a full config fetch per page.
/// The lifecycle is explicit: the host constructs the poller and calls
/// [`start`](Self::start) deliberately; nothing auto-starts on load.
///
/// While running, each tick performs one best-effort GET; on success the
/// record is cached and broadcast to subscribers, on failure the previous
/// cached values are left untouched.
pub struct LinksPoller {
    http: reqwest::Client,
    public_url: String,
    backend: Arc<dyn StorageBackend>,
    tx: broadcast::Sender<TelegramLinks>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LinksPoller {
    /// `public_url` is the full URL of the unauthenticated config endpoint.
    /// Publishes on the bus's telegram-links channel.
    pub fn new(public_url: impl Into<String>, backend: Arc<dyn StorageBackend>, events: &EventBus) -> Self {
        Self::with_interval(public_url, backend, events, config::poller::interval())
    }

    pub fn with_interval(
        public_url: impl Into<String>,
        backend: Arc<dyn StorageBackend>,
        events: &EventBus,
        interval: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config::network::timeout())
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            public_url: public_url.into(),
            backend,
            tx: events.links_sender(),
            interval,
            task: Mutex::new(None),
        }
    }

    /// Starts the background refresh loop. Idempotent: an already-running
    /// timer is cancelled first, so calling twice never doubles the fires.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
            log::debug!("links poller restarted, previous timer cancelled");
        }

        let http = self.http.clone();
        let url = self.public_url.clone();
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let interval = self.interval;

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of tokio's interval completes immediately;
            // consume it so fires land every `interval` after start, not
            // at start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                refresh(&http, &url, backend.as_ref(), &tx).await;
            }
        }));
        log::info!(
            "links poller started (every {}s)",
            self.interval.as_secs_f64()
        );
    }

    /// Stops the background loop. No timer survives this call.
    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            log::info!("links poller stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// One immediate fetch, bypassing the timer. Returns the fresh record
    /// (and caches + broadcasts it) or the error if the fetch failed.
    pub async fn sync_now(&self) -> Result<TelegramLinks, ApiError> {
        let links = fetch_links(&self.http, &self.public_url, self.backend.as_ref()).await?;
        publish(self.backend.as_ref(), &self.tx, &links);
        Ok(links)
    }

    /// The cached record, or the hardcoded defaults if nothing is cached.
    pub fn current_links(&self) -> TelegramLinks {
        load_cached_links(self.backend.as_ref()).unwrap_or_default()
    }

    /// Independent receiver for link updates (plain fan-out).
    pub fn subscribe(&self) -> broadcast::Receiver<TelegramLinks> {
        self.tx.subscribe()
    }
}

async fn refresh(
    http: &reqwest::Client,
    url: &str,
    backend: &dyn StorageBackend,
    tx: &broadcast::Sender<TelegramLinks>,
) {
    match fetch_links(http, url, backend).await {
        Ok(links) => publish(backend, tx, &links),
        // Prior cached values stay untouched, no partial overwrite.
        Err(e) => log::warn!("telegram links refresh failed: {}", e),
    }
}

fn publish(
    backend: &dyn StorageBackend,
    tx: &broadcast::Sender<TelegramLinks>,
    links: &TelegramLinks,
) {
    if let Err(e) = store_cached_links(backend, links) {
        log::warn!("could not cache telegram links: {}", e);
    }
    let _ = tx.send(links.clone());
    log::debug!("telegram links refreshed");
}

async fn fetch_links(
    http: &reqwest::Client,
    url: &str,
    backend: &dyn StorageBackend,
) -> Result<TelegramLinks, ApiError> {
    let resp = http.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ApiError::Http(status));
    }
    let value: Value = resp
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

    // The links live under `telegramLinks` in the public projection; fields
    // missing from the response keep their previously cached value.
    let fallback = load_cached_links(backend).unwrap_or_default();
    let node = value.get("telegramLinks").unwrap_or(&value);
    let field = |name: &str, prior: &str| -> String {
        node.get(name)
            .and_then(Value::as_str)
            .unwrap_or(prior)
            .to_string()
    };
    Ok(TelegramLinks {
        inscription_telegram_link: field(
            "inscriptionTelegramLink",
            &fallback.inscription_telegram_link,
        ),
        services_telegram_link: field("servicesTelegramLink", &fallback.services_telegram_link),
    })
}
