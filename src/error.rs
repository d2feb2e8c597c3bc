//! Error types returned by the client and the webhook verifier.

/// Errors surfaced to callers. None of them are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Verification was requested but the payload carries no `sign` field.
    #[error("missing signature")]
    MissingSignature,

    /// The recomputed signature differs from the embedded one.
    #[error("invalid signature")]
    InvalidSignature,

    /// The `type` discriminator is neither `payment` nor `payout`.
    #[error("unknown webhook type: {0:?}")]
    UnknownWebhookType(String),

    /// A request was rejected locally before being sent.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The gateway answered with a non-success status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;
