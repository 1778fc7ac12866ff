//! Tracing subscriber initialization.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "streamgate=info,ytdlp_extractor=info";

/// Initialize the global tracing subscriber.
///
/// An explicit `filter` wins; otherwise `RUST_LOG` applies, falling back
/// to [`DEFAULT_LOG_FILTER`]. Call once at startup.
pub fn init(filter: Option<&str>) {
    let env_filter = match filter {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
