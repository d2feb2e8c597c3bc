// config.rs
use std::fmt;

use anyhow::Result;
use cryptomus_client::DEFAULT_BASE_URL;
use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub merchant_id: String,
    pub payment_api_key: String,
    pub payout_api_key: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_verify_signatures() -> bool {
    true
}

impl Config {
    /// Reads `CRYPTOMUS_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::from_environment(::config::Environment::with_prefix("CRYPTOMUS"))
    }

    fn from_environment(environment: ::config::Environment) -> Result<Self> {
        ::config::Config::builder()
            .add_source(environment)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("merchant_id", &self.merchant_id)
            .field("payment_api_key", &"[REDACTED]")
            .field("payout_api_key", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("base_url", &self.base_url)
            .field("verify_signatures", &self.verify_signatures)
            .finish()
    }
}
