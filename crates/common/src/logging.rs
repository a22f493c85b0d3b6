//! Logging and tracing initialization.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Dependencies that are chatty at `debug` and rarely useful.
const QUIET_DIRECTIVES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "h2=warn"];

/// Build the filter directive string for a configured level.
///
/// `RUST_LOG` takes precedence over this when set.
pub fn filter_directives(level: &str) -> String {
    let mut directives = vec![level.trim().to_string()];
    directives.extend(QUIET_DIRECTIVES.iter().map(|d| d.to_string()));
    directives.join(",")
}

/// Initialize the tracing subscriber with the given configuration.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_current_span(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    }
}

/// Route logs through the test harness writer so they show up only for failing tests.
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter_directives("debug")))
        .with_test_writer()
        .try_init();
}
