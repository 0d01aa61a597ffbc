use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the admin panel / shop data-access layer

/// Base URL of the remote bot API server
/// Read once at startup from PLUG_API_URL or defaults to the local dev server
pub static API_BASE_URL: Lazy<String> = Lazy::new(|| {
    env::var("PLUG_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string())
        .trim_end_matches('/')
        .to_string()
});

/// Same-origin reverse-proxy endpoint used when the direct call is blocked
/// or fails. The proxy accepts POST `{ endpoint, method, data }` and forwards
/// the request server-side. Unset means the proxy tier is skipped.
pub static PROXY_URL: Lazy<Option<String>> = Lazy::new(|| {
    env::var("PLUG_PROXY_URL")
        .ok()
        .map(|u| u.trim_end_matches('/').to_string())
});

/// Bearer token for authenticated admin calls
/// Read from PLUG_ADMIN_TOKEN; public endpoints work without it
pub static ADMIN_TOKEN: Lazy<Option<String>> = Lazy::new(|| env::var("PLUG_ADMIN_TOKEN").ok());

/// Directory holding the local fallback copies of remote state
/// Read from PLUG_STORAGE_DIR, defaults to ./.plugadmin
pub static STORAGE_DIR: Lazy<String> =
    Lazy::new(|| env::var("PLUG_STORAGE_DIR").unwrap_or_else(|_| ".plugadmin".to_string()));

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Debounced sync configuration
pub mod debounce {
    use super::Duration;

    /// Idle window before a toggle edit is synced (in milliseconds)
    pub const TOGGLE_DELAY_MS: u64 = 1000;

    /// Idle window before a free-text edit is synced (in milliseconds)
    /// Longer than toggles: typing produces a save per keystroke at the
    /// call-site's cadence
    pub const TEXT_DELAY_MS: u64 = 1500;

    /// Toggle debounce duration
    pub fn toggle_delay() -> Duration {
        Duration::from_millis(TOGGLE_DELAY_MS)
    }

    /// Free-text debounce duration
    pub fn text_delay() -> Duration {
        Duration::from_millis(TEXT_DELAY_MS)
    }
}

/// Telegram links poller configuration
pub mod poller {
    use super::Duration;

    /// Interval between background refreshes of the telegram links slice
    /// (in seconds)
    pub const SYNC_INTERVAL_SECS: u64 = 30;

    /// Poll interval duration
    pub fn interval() -> Duration {
        Duration::from_secs(SYNC_INTERVAL_SECS)
    }
}

/// Storage key namespace
///
/// Key names match what the remote service and shop pages already use, so an
/// operator inspecting the fallback files sees familiar names.
pub mod storage {
    /// Full configuration document fallback copy
    pub const CONFIG_KEY: &str = "findyourplug_config";

    /// Narrow two-URL telegram links cache, refreshed by the poller
    pub const LINKS_KEY: &str = "telegramLinks";

    /// Shop-facing social entries cache
    pub const SHOP_SOCIAL_KEY: &str = "shopSocialMediaList";
}

/// API paths on the remote bot server
pub mod api {
    /// Full configuration document (bearer-token authenticated)
    pub const CONFIG: &str = "/api/config";

    /// Unauthenticated narrow projection for public shop pages
    pub const PUBLIC_CONFIG: &str = "/api/public/config";

    /// Public listing feed for the shop
    pub const PUBLIC_PLUGS: &str = "/api/public/plugs";

    /// Operator broadcast to all bot users
    pub const BROADCAST: &str = "/api/broadcast";

    /// Image upload for listings and broadcasts
    pub const UPLOAD_IMAGE: &str = "/api/upload-image";

    /// Ask the bot to re-read its config without a restart
    pub const BOT_RELOAD: &str = "/api/bot/reload";

    /// Referral statistics for the admin dashboard
    pub const REFERRAL_STATS: &str = "/api/referrals/stats";
}
