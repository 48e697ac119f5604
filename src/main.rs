//! GBacquire - GB national standard document acquisition tool.
//!
//! A tool for acquiring published GB standard documents from the
//! national standards portal, including its captcha-protected
//! download flow.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gbacquire::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "gbacquire=info"
    } else {
        "gbacquire=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
