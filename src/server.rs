// server.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::client::CryptomusClient;
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct AppState {
    pub client: CryptomusClient,
    pub verify_signatures: bool,
}

/// Routes for receiving gateway notifications.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health_check))
        .with_state(Arc::new(state))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let webhook = state
        .client
        .parse_webhook(&body, state.verify_signatures)
        .map_err(|e| {
            warn!("Rejected webhook: {}", e);
            rejection_status(&e)
        })?;

    info!(
        kind = %webhook.webhook_type,
        uuid = %webhook.uuid,
        order_id = %webhook.order_id,
        status = %webhook.status,
        is_final = webhook.is_final,
        "Webhook accepted"
    );

    Ok(StatusCode::OK)
}

fn rejection_status(err: &Error) -> StatusCode {
    match err {
        Error::MissingSignature | Error::InvalidSignature => StatusCode::UNAUTHORIZED,
        Error::UnknownWebhookType(_) | Error::Decode(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now()
    }))
}
