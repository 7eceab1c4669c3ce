use crate::config::settings::AppConfig;

/// Initialize structured logging with tracing.
/// Call once at startup; `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &AppConfig) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.log_json {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    // A second init (tests, embedding) keeps the first subscriber
    if result.is_ok() {
        tracing::debug!(json = config.log_json, "Structured logging initialized");
    }
}
