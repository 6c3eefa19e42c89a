//! Initialization helpers for the application startup.

use crate::config::Config;

/// Sets up the tracing subscriber with the configured filters.
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Keep HTTP client internals quiet unless asked for
        for noisy in ["hyper", "reqwest", "rustls"] {
            if !filter.contains(noisy) {
                filter.push_str(&format!(",{noisy}=warn"));
            }
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
