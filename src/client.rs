use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};

use crate::config::{self, api};
use crate::errors::{classify, ApiError, Severity};
use crate::events::EventBus;
use crate::models::{ConfigDoc, Plug, ReferralStats, SocialMediaEntry};
use crate::store::LocalStore;

/// Best-effort client for the remote bot API.
///
/// Reads and writes try, in order: the direct endpoint, a same-origin
/// reverse-proxy endpoint, and finally the injected [`LocalStore`]. Which
/// tier reacts to a failure is decided purely by [`classify`]: transient
/// infra failures move down the chain, validation failures surface
/// immediately without changing the operating mode.
///
/// Concurrent writers: no version vector or ETag is sent. Two operators
/// editing at once resolve as last-writer-wins on the remote service.
pub struct ConfigClient {
    http: reqwest::Client,
    base_url: String,
    proxy_url: Option<String>,
    token: Option<String>,
    store: LocalStore,
    events: EventBus,
    local_mode: AtomicBool,
}

impl ConfigClient {
    pub fn new(
        base_url: impl Into<String>,
        proxy_url: Option<String>,
        token: Option<String>,
        store: LocalStore,
        events: EventBus,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config::network::timeout())
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            proxy_url: proxy_url.map(|u| u.trim_end_matches('/').to_string()),
            token,
            store,
            events,
            local_mode: AtomicBool::new(false),
        }
    }

    /// Builds a client from the process environment (see `config`).
    pub fn from_env(store: LocalStore, events: EventBus) -> Self {
        Self::new(
            config::API_BASE_URL.clone(),
            config::PROXY_URL.clone(),
            config::ADMIN_TOKEN.clone(),
            store,
            events,
        )
    }

    /// True after a read or write had to fall back to the local store.
    pub fn in_local_mode(&self) -> bool {
        self.local_mode.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetches the full configuration document.
    ///
    /// Direct → proxy → local store. The first successful parse wins; when a
    /// remote tier fails with a validation/auth error the error surfaces
    /// immediately. If every tier fails, [`ApiError::Exhausted`].
    pub async fn get_config(&self) -> Result<ConfigDoc, ApiError> {
        match self.fetch_json(Method::GET, api::CONFIG, None, true).await {
            Ok(value) => {
                return ConfigDoc::from_value(value)
                    .ok_or_else(|| ApiError::InvalidResponse("config is not an object".into()));
            }
            Err(e) if classify(&e) == Severity::Recoverable => return Err(e),
            Err(e) => {
                log::warn!("remote config unreachable, falling back to local copy: {}", e);
            }
        }

        self.local_mode.store(true, Ordering::SeqCst);
        self.store.load().ok_or(ApiError::Exhausted)
    }

    /// Unauthenticated narrow projection for public shop pages.
    /// Direct → proxy only; caching is the poller's job.
    pub async fn get_public_config(&self) -> Result<Value, ApiError> {
        self.fetch_json(Method::GET, api::PUBLIC_CONFIG, None, false)
            .await
    }

    /// Public listing feed for the shop.
    pub async fn get_plugs(&self) -> Result<Vec<Plug>, ApiError> {
        let value = self
            .fetch_json(Method::GET, api::PUBLIC_PLUGS, None, false)
            .await?;
        // The feed is either a bare array or wrapped in `{ "plugs": [...] }`.
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("plugs") {
                Some(Value::Array(items)) => items,
                _ => return Err(ApiError::InvalidResponse("expected a plug list".into())),
            },
            _ => return Err(ApiError::InvalidResponse("expected a plug list".into())),
        };
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    /// Referral statistics for the admin dashboard.
    pub async fn referral_stats(&self) -> Result<ReferralStats, ApiError> {
        let value = self
            .fetch_json(Method::GET, api::REFERRAL_STATS, None, true)
            .await?;
        serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Merges `patch` into the current document and delivers the *entire*
    /// merged document to the remote service (the remote replaces wholesale
    /// every field it receives; this is not a partial patch protocol).
    ///
    /// On total remote failure the merged document is saved locally, stamped
    /// `_isLocal`, and returned; the edit is never lost. Validation and
    /// auth failures surface without touching the local copy.
    pub async fn update_config(&self, patch: Map<String, Value>) -> Result<ConfigDoc, ApiError> {
        let mut current = match self.get_config().await {
            Ok(doc) => doc,
            Err(ApiError::Exhausted) => ConfigDoc::defaults(),
            Err(e) => return Err(e),
        };
        current.merge(patch);

        match self.push_config(&current).await {
            Ok(()) => Ok(current),
            Err(e) if classify(&e) == Severity::Recoverable => Err(e),
            Err(e) => {
                log::warn!("remote write failed, keeping config locally: {}", e);
                let stamped = self.store.save(&current)?;
                self.local_mode.store(true, Ordering::SeqCst);
                Ok(stamped)
            }
        }
    }

    /// Delivers a full document to the remote service: direct PUT first,
    /// then the proxy with a `_method` field simulating the verb (the proxy
    /// only accepts POST). Does not touch the local store; callers decide
    /// what a total failure means.
    pub async fn push_config(&self, doc: &ConfigDoc) -> Result<(), ApiError> {
        self.fetch_json(Method::PUT, api::CONFIG, Some(doc.as_value()), true)
            .await?;
        self.reload_bot().await;
        Ok(())
    }

    /// Replaces the bot-menu social media list.
    pub async fn update_social_media(
        &self,
        list: Vec<SocialMediaEntry>,
    ) -> Result<ConfigDoc, ApiError> {
        let mut patch = Map::new();
        patch.insert("socialMedia".to_string(), json!(list));
        self.update_config(patch).await
    }

    /// Replaces the shop-footer social media list, caches it for public
    /// pages, and republishes it to subscribers (shop pages re-render from
    /// the event).
    pub async fn update_shop_social_media(
        &self,
        list: Vec<SocialMediaEntry>,
    ) -> Result<ConfigDoc, ApiError> {
        let mut patch = Map::new();
        patch.insert("shopSocialMedia".to_string(), json!(list));
        let doc = self.update_config(patch).await?;
        if let Err(e) = crate::store::store_cached_shop_social(self.store.backend().as_ref(), &list)
        {
            log::warn!("could not cache shop social list: {}", e);
        }
        self.events.publish_shop_social(list);
        Ok(doc)
    }

    /// Replaces the language settings and notifies subscribers of the new
    /// current language, if one is set.
    pub async fn update_languages(&self, languages: Value) -> Result<ConfigDoc, ApiError> {
        let current = languages
            .get("currentLanguage")
            .and_then(Value::as_str)
            .map(str::to_string);
        let mut patch = Map::new();
        patch.insert("languages".to_string(), languages);
        let doc = self.update_config(patch).await?;
        if let Some(code) = current {
            self.events.publish_language(code);
        }
        Ok(doc)
    }

    // ------------------------------------------------------------------
    // Operator side effects
    // ------------------------------------------------------------------

    /// Atomic like on a listing. Returns the new like count so the caller
    /// can mirror it optimistically into UI state.
    pub async fn vote(&self, plug_id: &str) -> Result<i64, ApiError> {
        let path = format!("{}/{}/vote", api::PUBLIC_PLUGS, plug_id);
        let value = self.fetch_json(Method::POST, &path, None, false).await?;
        value
            .get("likes")
            .and_then(Value::as_i64)
            .ok_or_else(|| ApiError::InvalidResponse("vote response missing likes".into()))
    }

    /// Sends a broadcast message to every bot user. Returns the raw
    /// acknowledgment (delivered counts etc. vary by server version).
    pub async fn broadcast(&self, message: &str, image: Option<&str>) -> Result<Value, ApiError> {
        let body = json!({ "message": message, "image": image });
        self.fetch_json(Method::POST, api::BROADCAST, Some(body), true)
            .await
    }

    /// Uploads an image and returns its public URL. Direct tier only: the
    /// proxy envelope is JSON and cannot carry multipart bodies.
    pub async fn upload_image(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);

        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, api::UPLOAD_IMAGE))
            .multipart(form);
        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }

        let value = Self::handle_response(req.send().await?).await?;
        value
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidResponse("upload response missing url".into()))
    }

    /// Asks the bot to re-read its config so a successful write takes effect
    /// without a restart. Best-effort: failures are logged and swallowed.
    pub async fn reload_bot(&self) {
        match self
            .direct_request(Method::POST, api::BOT_RELOAD, None, true)
            .await
        {
            Ok(_) => log::debug!("bot reload requested"),
            Err(e) => log::warn!("bot reload request failed (ignored): {}", e),
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    /// Direct tier, then proxy tier, decided by [`classify`]. Marks the
    /// client remote-healthy on success.
    async fn fetch_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        authed: bool,
    ) -> Result<Value, ApiError> {
        let direct_err = match self
            .direct_request(method.clone(), path, body.as_ref(), authed)
            .await
        {
            Ok(value) => {
                self.local_mode.store(false, Ordering::SeqCst);
                return Ok(value);
            }
            Err(e) if classify(&e) == Severity::Recoverable => return Err(e),
            Err(e) => e,
        };

        if self.proxy_url.is_none() {
            return Err(direct_err);
        }
        log::warn!("direct call to {} failed, retrying via proxy: {}", path, direct_err);

        let data = if method == Method::GET {
            None
        } else {
            match body {
                Some(Value::Object(mut map)) => {
                    if method != Method::POST {
                        map.insert("_method".to_string(), Value::String(method.to_string()));
                    }
                    Some(Value::Object(map))
                }
                other => other,
            }
        };
        let envelope_method = if method == Method::GET { "GET" } else { "POST" };

        let value = self.proxy_request(path, envelope_method, data).await?;
        self.local_mode.store(false, Ordering::SeqCst);
        Ok(value)
    }

    async fn direct_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authed: bool,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);

        if authed {
            if let Some(auth) = self.auth_header() {
                req = req.header(reqwest::header::AUTHORIZATION, auth);
            }
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        Self::handle_response(resp).await
    }

    async fn proxy_request(
        &self,
        endpoint: &str,
        method: &str,
        data: Option<Value>,
    ) -> Result<Value, ApiError> {
        let proxy_url = self
            .proxy_url
            .as_ref()
            .ok_or_else(|| ApiError::InvalidResponse("no proxy configured".into()))?;

        let envelope = json!({
            "endpoint": endpoint,
            "method": method,
            "data": data,
        });

        let mut req = self.http.post(proxy_url).json(&envelope);
        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }

        let resp = req.send().await?;
        Self::handle_response(resp).await
    }

    async fn handle_response(resp: reqwest::Response) -> Result<Value, ApiError> {
        let status = resp.status();

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
                StatusCode::BAD_REQUEST => Err(ApiError::Validation(text)),
                _ => Err(ApiError::Http(status)),
            };
        }

        resp.json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}
