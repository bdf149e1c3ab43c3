use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor a configured level is available
pub const DEFAULT_LOG_FILTER: &str = "whatsapp_dispatcher=info";

/// Build the log filter: `RUST_LOG` wins, then the configured level.
pub fn build_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        Some(level) => EnvFilter::new(format!("whatsapp_dispatcher={}", level)),
        None => EnvFilter::new(DEFAULT_LOG_FILTER),
    })
}

/// Install the global subscriber. Repeated calls are ignored.
pub fn init_tracing(level: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .try_init();
}
