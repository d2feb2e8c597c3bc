//! Client for the Cryptomus payment gateway.
//!
//! Builds signed requests for the webhook endpoints of the API and parses
//! the payment/payout notifications the gateway delivers, verifying their
//! embedded signature.

pub mod client;
pub mod error;
pub mod server;
pub mod sign;
pub mod webhook;

pub use client::{
    ApiKeys, CryptomusClient, ResendWebhookRequest, TestWebhookRequest, WebhookActionResponse,
    DEFAULT_BASE_URL,
};
pub use error::{Error, Result};
pub use webhook::{Webhook, WebhookConvert, WebhookKind};
