//! Seatbook load harness.
//!
//! Drives a running server from many connections at once and exits non-zero
//! as soon as it observes incorrect behaviour.

use seatbook_tester::{Config, Tester};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatbook_tester=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(?config, "Loaded configuration");

    let result = match Tester::start(config).await {
        Ok(tester) => tester.run().await,
        Err(error) => Err(error),
    };

    if let Err(error) = &result {
        error!(%error, "❌ TEST FAILED ❌");
    }
    result.map_err(anyhow::Error::from)
}
