//! Tracing subscriber setup.

use {
    magpie_config::LoggingConfig,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Initialize the global tracing subscriber from config.
///
/// `RUST_LOG` wins over the configured level when set. Safe to call more
/// than once; only the first call installs a subscriber.
pub fn init_telemetry(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        let _ = registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .try_init();
    } else {
        let _ = registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .try_init();
    }
}
