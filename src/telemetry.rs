use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Initializes structured logging using `tracing-subscriber`.
///
/// `RUST_LOG` takes precedence over `logging.level`. Calling this twice is
/// harmless; the second install attempt is ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let _ = match config.format.as_str() {
        "pretty" => builder.pretty().try_init(),
        _ => builder.json().try_init(),
    };
}
