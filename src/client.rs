// client.rs
use std::fmt;

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::sign::sign;
use crate::webhook::{self, null_as_default, Webhook, WebhookKind};

pub const DEFAULT_BASE_URL: &str = "https://api.cryptomus.com/v1";

const RESEND_WEBHOOK_ENDPOINT: &str = "/payment/resend";
const TEST_PAYMENT_WEBHOOK_ENDPOINT: &str = "/test-webhook/payment";
const TEST_PAYOUT_WEBHOOK_ENDPOINT: &str = "/test-webhook/payout";

/// The payment and payout API keys of a merchant.
#[derive(Clone)]
pub struct ApiKeys {
    payment: String,
    payout: String,
}

impl ApiKeys {
    pub fn new(payment: impl Into<String>, payout: impl Into<String>) -> Self {
        Self {
            payment: payment.into(),
            payout: payout.into(),
        }
    }

    pub fn for_kind(&self, kind: WebhookKind) -> &str {
        match kind {
            WebhookKind::Payment => &self.payment,
            WebhookKind::Payout => &self.payout,
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("payment", &"[REDACTED]")
            .field("payout", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResendWebhookRequest {
    #[serde(rename = "uuid", skip_serializing_if = "String::is_empty")]
    pub payment_uuid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_id: String,
}

impl ResendWebhookRequest {
    pub fn by_payment_uuid(uuid: impl Into<String>) -> Self {
        Self {
            payment_uuid: uuid.into(),
            ..Default::default()
        }
    }

    pub fn by_order_id(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TestWebhookRequest {
    pub url_callback: String,
    pub currency: String,
    pub network: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_id: String,
    pub status: String,
}

/// Response of the resend and test-webhook endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookActionResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: Vec<String>,
    pub state: i8,
}

impl WebhookActionResponse {
    /// True when the gateway reported no errors for the request.
    pub fn is_accepted(&self) -> bool {
        self.result.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CryptomusClient {
    client: Client,
    merchant_id: String,
    keys: ApiKeys,
    base_url: String,
}

impl CryptomusClient {
    pub fn new(
        merchant_id: impl Into<String>,
        payment_api_key: impl Into<String>,
        payout_api_key: impl Into<String>,
    ) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("cryptomus-client/0.1"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            merchant_id: merchant_id.into(),
            keys: ApiKeys::new(payment_api_key, payout_api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn keys(&self) -> &ApiKeys {
        &self.keys
    }

    /// Parses a webhook body delivered by the gateway. With `verify_sign`
    /// set, the signature is checked against the key for the notification's
    /// type and cleared from the returned record.
    pub fn parse_webhook(&self, body: &[u8], verify_sign: bool) -> Result<Webhook> {
        webhook::parse(body, &self.keys, verify_sign)
    }

    /// Asks the gateway to deliver the last webhook of a payment again.
    #[instrument(skip(self, request))]
    pub async fn resend_webhook(
        &self,
        request: &ResendWebhookRequest,
    ) -> Result<WebhookActionResponse> {
        if request.payment_uuid.is_empty() && request.order_id.is_empty() {
            return Err(Error::Validation(
                "one of payment uuid or order id is required".to_string(),
            ));
        }

        self.fetch(RESEND_WEBHOOK_ENDPOINT, request).await
    }

    #[instrument(skip(self, request))]
    pub async fn test_payment_webhook(
        &self,
        request: &TestWebhookRequest,
    ) -> Result<WebhookActionResponse> {
        self.fetch(TEST_PAYMENT_WEBHOOK_ENDPOINT, request).await
    }

    #[instrument(skip(self, request))]
    pub async fn test_payout_webhook(
        &self,
        request: &TestWebhookRequest,
    ) -> Result<WebhookActionResponse> {
        self.fetch(TEST_PAYOUT_WEBHOOK_ENDPOINT, request).await
    }

    async fn fetch<T, R>(&self, endpoint: &str, payload: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(payload).map_err(Error::Encode)?;
        let signature = sign(self.keys.for_kind(WebhookKind::Payment), &body);

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "sending request");

        let response = self
            .client
            .post(&url)
            .header("merchant", header::HeaderValue::from_str(&self.merchant_id)?)
            .header("sign", header::HeaderValue::from_str(&signature)?)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            debug!(%url, status = status.as_u16(), "request rejected");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}
