use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Defaults to `info`, or `debug` in debug
/// builds; `RUST_LOG` overrides either.
pub fn init() {
    let level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Another subscriber may already be installed by an embedder.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
