use anyhow::Result;
use dotenvy::dotenv;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::signal;

use plugadmin::cli::{Cli, Commands, SocialAction};
use plugadmin::{
    config, i18n, logging, ConfigClient, EventBus, FileStorage, LinksPoller, LocalStore,
    SocialMediaEntry, StorageBackend, SyncDebouncer, SyncOutcome,
};

/// Main entry point for the operator CLI.
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, storage, HTTP client).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    logging::init_logger()?;

    let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(&*config::STORAGE_DIR)?);
    let store = LocalStore::new(Arc::clone(&backend));
    store.init()?;

    let events = EventBus::new();
    let client = Arc::new(ConfigClient::from_env(store, events.clone()));

    // Operator-facing messages honor PLUG_LANG, French otherwise.
    let lang = i18n::lang_from_code(&std::env::var("PLUG_LANG").unwrap_or_else(|_| "fr".into()));

    match cli.command {
        Some(Commands::ShowConfig { public }) => {
            let value = if public {
                client.get_public_config().await?
            } else {
                client.get_config().await?.as_value()
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
            if client.in_local_mode() {
                eprintln!("⚠️  {}", i18n::t(&lang, "shop_offline_notice"));
            }
            Ok(())
        }

        Some(Commands::Set { key, value, text }) => {
            let parsed: Value =
                serde_json::from_str(&value).unwrap_or_else(|_| Value::String(value.clone()));
            let mut patch = Map::new();
            patch.insert(key.clone(), parsed);

            let delay = if text {
                config::debounce::text_delay()
            } else {
                config::debounce::toggle_delay()
            };
            dispatch_patch(&client, &format!("config:{}", key), patch, delay).await;
            report_save(&client, &lang);
            Ok(())
        }

        Some(Commands::Social { action }) => {
            let doc = client.get_config().await?;
            let mut list = doc.shop_social_media();
            match action {
                SocialAction::Add { name, emoji, url } => {
                    let id = SocialMediaEntry::unique_id(&list, &name);
                    list.push(SocialMediaEntry {
                        id,
                        name,
                        emoji,
                        url,
                        enabled: true,
                        order: Some(list.len() as u32),
                    });
                }
                SocialAction::Toggle { id } => {
                    match list.iter_mut().find(|e| e.id == id) {
                        Some(entry) => entry.enabled = !entry.enabled,
                        None => anyhow::bail!("no social media entry with id '{}'", id),
                    }
                }
            }

            let debouncer = SyncDebouncer::new();
            let task = Arc::clone(&client);
            debouncer
                .schedule(
                    "shop_social_media",
                    config::debounce::toggle_delay(),
                    async move {
                        if let Err(e) = task.update_shop_social_media(list).await {
                            log::error!("sync failed: {}", e);
                        }
                    },
                )
                .await;
            while debouncer.pending_count().await > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            report_save(&client, &lang);
            Ok(())
        }

        Some(Commands::Broadcast { message, image }) => {
            let ack = client.broadcast(&message, image.as_deref()).await?;
            let delivered = ack.get("delivered").and_then(Value::as_i64).unwrap_or(0);
            let mut args = fluent_templates::fluent_bundle::FluentArgs::new();
            args.set("count", delivered);
            println!("{}", i18n::t_args(&lang, "admin_broadcast_sent", &args));
            Ok(())
        }

        Some(Commands::Sync) => {
            match client.store().sync_with_server(&client).await? {
                SyncOutcome::Synced => println!("✅ {}", i18n::t(&lang, "admin_sync_done")),
                SyncOutcome::AlreadySynced => {
                    println!("✅ nothing to push — remote copy is authoritative")
                }
                SyncOutcome::NotSynced => println!("❌ {}", i18n::t(&lang, "admin_sync_failed")),
            }
            Ok(())
        }

        Some(Commands::ClearLocal) => {
            client.store().clear()?;
            println!("🗑 local copy reset to defaults");
            Ok(())
        }

        Some(Commands::Links { now, watch }) => {
            let public_url = format!("{}{}", &*config::API_BASE_URL, config::api::PUBLIC_CONFIG);
            let poller = LinksPoller::new(public_url, Arc::clone(&backend), &events);

            if now {
                let links = poller.sync_now().await?;
                print_links(&lang, &links);
                return Ok(());
            }

            if watch {
                let mut updates = poller.subscribe();
                poller.start().await;
                println!("watching for link updates, Ctrl-C to stop...");
                loop {
                    tokio::select! {
                        update = updates.recv() => match update {
                            Ok(links) => print_links(&lang, &links),
                            Err(e) => {
                                log::warn!("links subscription closed: {}", e);
                                break;
                            }
                        },
                        _ = signal::ctrl_c() => break,
                    }
                }
                poller.stop().await;
                return Ok(());
            }

            print_links(&lang, &poller.current_links());
            Ok(())
        }

        Some(Commands::Stats) => {
            let stats = client.referral_stats().await?;
            println!("👥 users: {}", stats.total_users);
            println!("🔗 referrals: {}", stats.total_referrals);
            for entry in &stats.top_referrers {
                println!("   • {} — {}", entry.name, entry.referrals);
            }
            Ok(())
        }

        Some(Commands::Vote { plug_id }) => {
            let likes = client.vote(&plug_id).await?;
            let mut args = fluent_templates::fluent_bundle::FluentArgs::new();
            args.set("count", likes);
            println!("👍 {}", i18n::t_args(&lang, "shop_votes", &args));
            Ok(())
        }

        None => {
            println!("no command given — try `plugadmin --help`");
            Ok(())
        }
    }
}

/// Routes one edit through the debounced dispatcher, mirroring the admin
/// panel's save cadence, and waits for the window to elapse so the one-shot
/// process does not exit with the sync still pending.
async fn dispatch_patch(
    client: &Arc<ConfigClient>,
    target: &str,
    patch: Map<String, Value>,
    delay: std::time::Duration,
) {
    let debouncer = SyncDebouncer::new();
    let task = Arc::clone(client);
    debouncer
        .schedule(target, delay, async move {
            if let Err(e) = task.update_config(patch).await {
                log::error!("sync failed: {}", e);
            }
        })
        .await;

    while debouncer.pending_count().await > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

fn report_save(client: &ConfigClient, lang: &unic_langid::LanguageIdentifier) {
    if client.in_local_mode() {
        println!("⚠️  {}", i18n::t(lang, "admin_saved_local"));
    } else {
        println!("✅ {}", i18n::t(lang, "admin_saved"));
    }
}

fn print_links(lang: &unic_langid::LanguageIdentifier, links: &plugadmin::TelegramLinks) {
    println!(
        "{}: {}",
        i18n::t(lang, "links_inscription"),
        links.inscription_telegram_link
    );
    println!(
        "{}: {}",
        i18n::t(lang, "links_services"),
        links.services_telegram_link
    );
}
