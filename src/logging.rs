use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "loreweave=info";

/// Installs the global JSON subscriber. The embedding application calls
/// this once at startup; consumers that bring their own subscriber skip it.
pub fn init_subscriber() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json())
        .init();

    tracing::info!("Tracing subscriber initialized.");
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_DIRECTIVE.into())
}
