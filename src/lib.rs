//! Plugadmin: data-access core for the FindYourPlug Telegram storefront
//!
//! This library provides everything the admin panel and public shop need to
//! talk to the remote bot API: a resilient config client with a
//! direct → proxy → local-storage fallback chain, a debounced sync
//! dispatcher that coalesces rapid edits, a background poller for the
//! telegram links slice, a browser-independent local persistence store, and
//! the translation lookup for shop pages.
//!
//! # Module Structure
//!
//! - `client`: resilient remote reads/writes with tiered fallback
//! - `store`: local fallback persistence behind an injected backend
//! - `debounce`: coalesces bursts of edits into single sync calls
//! - `poller`: periodic refresh of the telegram links record
//! - `events`: typed in-process pub/sub between components
//! - `i18n`: language lookup with the fr-default fallback chain
//! - `config` / `errors` / `logging`: ambient wiring

pub mod cli;
pub mod client;
pub mod config;
pub mod debounce;
pub mod errors;
pub mod events;
pub mod i18n;
pub mod logging;
pub mod models;
pub mod poller;
pub mod store;

// Re-export commonly used types for convenience
pub use client::ConfigClient;
pub use debounce::SyncDebouncer;
pub use errors::{classify, ApiError, Severity};
pub use events::EventBus;
pub use models::{ConfigDoc, Plug, SocialMediaEntry, TelegramLinks};
pub use poller::LinksPoller;
pub use store::{FileStorage, LocalStore, MemoryStorage, StorageBackend, SyncOutcome};
