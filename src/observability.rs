use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AuthConfig, Environment};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Production logs as JSON
/// lines, dev logs human-readable.
pub fn init_tracing(config: &AuthConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={},tower_http=info",
            env!("CARGO_CRATE_NAME"),
            config.log_level
        ))
    });

    if config.environment == Environment::Prod {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}
