use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a JSON stdout subscriber; the level comes from `RUST_LOG`
/// (default `info`). A second call is a no-op, so tests may call it freely.
pub fn init_telemetry() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init();
}
