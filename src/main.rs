use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use crate::config::Config;
use cryptomus_client::server::{self, AppState};
use cryptomus_client::CryptomusClient;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load()?;
    let client = CryptomusClient::new(
        &config.merchant_id,
        &config.payment_api_key,
        &config.payout_api_key,
    )?
    .with_base_url(&config.base_url);

    if !config.verify_signatures {
        info!("Webhook signature verification is disabled");
    }

    let app = server::router(AppState {
        client,
        verify_signatures: config.verify_signatures,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
