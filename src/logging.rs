use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber with the `log` bridge, so the
/// library's `log::` macros and any `tracing` events land in one place.
///
/// Filter via RUST_LOG (defaults to `info`). Safe to call once per process;
/// a second call reports the conflict instead of panicking.
pub fn init_logger() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}
