use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sets the default log level from the RUST_LOG env var, defaulting to INFO
/// for this crate if not set.
pub fn init_subscriber() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "bloodwork=info".into()))
        .with(fmt::layer())
        .init();
}
