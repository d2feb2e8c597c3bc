// webhook.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::client::ApiKeys;
use crate::error::{Error, Result};
use crate::sign::{sign, signatures_match};

/// Which secret a notification is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookKind {
    Payment,
    Payout,
}

impl WebhookKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WebhookKind::Payment => "payment",
            WebhookKind::Payout => "payout",
        }
    }
}

impl FromStr for WebhookKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "payment" => Ok(WebhookKind::Payment),
            "payout" => Ok(WebhookKind::Payout),
            other => Err(Error::UnknownWebhookType(other.to_string())),
        }
    }
}

impl fmt::Display for WebhookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebhookConvert {
    #[serde(default, deserialize_with = "null_as_default")]
    pub to_currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub commission: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rate: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: String,
}

/// A payment or payout status notification pushed by the gateway.
///
/// Field order and the null/omit rules below are part of the signing
/// contract: the gateway signs the record in exactly this shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Webhook {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub webhook_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: String,
    #[serde(default)]
    pub payment_amount: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_amount_usd: String,
    #[serde(default)]
    pub merchant_amount: Option<String>,
    #[serde(default)]
    pub commission: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_final: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub wallet_address_uuid: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default)]
    pub payer_currency: Option<String>,
    #[serde(default)]
    pub payer_amount: Option<String>,
    #[serde(default)]
    pub payer_amount_exchange_rate: Option<String>,
    #[serde(default)]
    pub additional_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert: Option<WebhookConvert>,
    #[serde(default)]
    pub transfer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
}

impl Webhook {
    pub fn kind(&self) -> Result<WebhookKind> {
        self.webhook_type.parse()
    }

    /// Serializes the record without its signature, with `/` escaped the
    /// way the gateway escapes it before signing.
    pub fn canonical_json(&self) -> Result<String> {
        let unsigned = Webhook {
            sign: None,
            ..self.clone()
        };
        let json = serde_json::to_string(&unsigned).map_err(Error::Encode)?;
        Ok(escape_slashes(&json))
    }

    /// Signs the record with `secret_key` and stores the result in `sign`.
    pub fn attach_signature(&mut self, secret_key: &str) -> Result<()> {
        let canonical = self.canonical_json()?;
        self.sign = Some(sign(secret_key, canonical.as_bytes()));
        Ok(())
    }

    /// Checks the embedded signature against `secret_key`.
    ///
    /// The signature is removed from the record whether or not it matches.
    pub fn verify(&mut self, secret_key: &str) -> Result<()> {
        let webhook_sign = self.sign.take().ok_or(Error::MissingSignature)?;

        let canonical = self.canonical_json()?;
        let expected_sign = sign(secret_key, canonical.as_bytes());

        if !signatures_match(&expected_sign, &webhook_sign) {
            warn!(uuid = %self.uuid, order_id = %self.order_id, "webhook signature mismatch");
            return Err(Error::InvalidSignature);
        }

        Ok(())
    }
}

/// Parses a raw webhook body, optionally verifying its signature with the
/// key that matches the notification type.
pub fn parse(body: &[u8], keys: &ApiKeys, verify_sign: bool) -> Result<Webhook> {
    let mut webhook: Webhook = serde_json::from_slice(body)?;

    if verify_sign {
        let kind = webhook.kind()?;
        webhook.verify(keys.for_kind(kind))?;
        debug!(%kind, uuid = %webhook.uuid, "webhook signature verified");
    }

    Ok(webhook)
}

/// Escapes every `/` in serialized JSON as `\/`, leaving existing escape
/// sequences untouched so the pass can be applied more than once.
pub fn escape_slashes(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + json.len() / 8);
    let mut chars = json.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '/' => out.push_str("\\/"),
            _ => out.push(c),
        }
    }

    out
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> ApiKeys {
        ApiKeys::new("payment-key", "payout-key")
    }

    #[test]
    fn canonical_form_keeps_field_order_and_nulls() {
        let webhook: Webhook =
            serde_json::from_str(r#"{"uuid":"u-1","type":"payment","sign":"x"}"#).unwrap();

        assert_eq!(
            webhook.canonical_json().unwrap(),
            concat!(
                r#"{"type":"payment","uuid":"u-1","order_id":"","amount":"","#,
                r#""payment_amount":null,"payment_amount_usd":"","merchant_amount":null,"#,
                r#""commission":null,"is_final":false,"status":"","from":null,"#,
                r#""wallet_address_uuid":null,"network":null,"currency":"","#,
                r#""payer_currency":null,"payer_amount":null,"#,
                r#""payer_amount_exchange_rate":null,"additional_data":null,"#,
                r#""transfer_id":null}"#
            )
        );
    }

    #[test]
    fn convert_and_txid_are_emitted_when_present() {
        let webhook: Webhook = serde_json::from_str(
            r#"{"type":"payout","txid":"abc","convert":{"to_currency":"USDT","commission":null,"rate":"1","amount":"2"}}"#,
        )
        .unwrap();

        let canonical = webhook.canonical_json().unwrap();
        assert!(canonical.ends_with(
            r#""convert":{"to_currency":"USDT","commission":"","rate":"1","amount":"2"},"transfer_id":null,"txid":"abc"}"#
        ));
    }

    #[test]
    fn absent_and_empty_are_distinct() {
        let absent: Webhook = serde_json::from_str(r#"{"type":"payment"}"#).unwrap();
        let empty: Webhook =
            serde_json::from_str(r#"{"type":"payment","network":""}"#).unwrap();

        assert_eq!(absent.network, None);
        assert_eq!(empty.network.as_deref(), Some(""));
        assert_ne!(
            absent.canonical_json().unwrap(),
            empty.canonical_json().unwrap()
        );
    }

    #[test]
    fn null_in_plain_string_field_reads_as_empty() {
        let webhook: Webhook =
            serde_json::from_str(r#"{"type":"payment","order_id":null,"is_final":null}"#)
                .unwrap();
        assert_eq!(webhook.order_id, "");
        assert!(!webhook.is_final);
    }

    #[test]
    fn slashes_are_escaped_in_canonical_form() {
        let webhook = Webhook {
            webhook_type: "payment".into(),
            additional_data: Some("https://shop.example/a/b".into()),
            ..Default::default()
        };

        let canonical = webhook.canonical_json().unwrap();
        assert!(canonical.contains(r#""additional_data":"https:\/\/shop.example\/a\/b""#));
    }

    #[test]
    fn escaping_is_idempotent() {
        let raw = r#"{"a":"x/y","b":"back\\/slash","c":"é/"}"#;
        let once = escape_slashes(raw);
        assert_eq!(once, r#"{"a":"x\/y","b":"back\\\/slash","c":"é\/"}"#);
        assert_eq!(escape_slashes(&once), once);
    }

    #[test]
    fn kind_parses_only_known_values() {
        assert_eq!("payment".parse::<WebhookKind>().unwrap(), WebhookKind::Payment);
        assert_eq!("payout".parse::<WebhookKind>().unwrap(), WebhookKind::Payout);
        assert!(matches!(
            "Payment".parse::<WebhookKind>(),
            Err(Error::UnknownWebhookType(t)) if t == "Payment"
        ));
    }

    #[test]
    fn attach_then_verify_succeeds_and_clears_sign() {
        let mut webhook = Webhook {
            webhook_type: "payout".into(),
            uuid: "u-2".into(),
            status: "paid".into(),
            ..Default::default()
        };
        webhook.attach_signature("payout-key").unwrap();

        let body = serde_json::to_vec(&webhook).unwrap();
        let parsed = parse(&body, &keys(), true).unwrap();
        assert_eq!(parsed.sign, None);
        assert_eq!(parsed.uuid, "u-2");
    }

    #[test]
    fn payment_key_does_not_verify_payout() {
        let mut webhook = Webhook {
            webhook_type: "payout".into(),
            ..Default::default()
        };
        webhook.attach_signature("payment-key").unwrap();

        let body = serde_json::to_vec(&webhook).unwrap();
        assert!(matches!(
            parse(&body, &keys(), true),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn unverified_parse_keeps_sign() {
        let parsed = parse(br#"{"type":"other","sign":"abc"}"#, &keys(), false).unwrap();
        assert_eq!(parsed.sign.as_deref(), Some("abc"));
    }
}
