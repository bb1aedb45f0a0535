//! Logging setup.
//!
//! The filter comes from `SAGA_LOG` (falling back to `RUST_LOG`, then
//! `info`), e.g. `SAGA_LOG=saga_bridge=debug`.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "SAGA_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install a console subscriber. Safe to call more than once.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = log_filter();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_filter(EnvFilter::new(&filter)),
        );

        // Another subscriber (e.g. from an embedding application) wins.
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already set");
            return;
        }
        tracing::debug!(filter = %filter, "logging initialized");
    });
}

fn log_filter() -> String {
    std::env::var(LOG_ENV_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}
