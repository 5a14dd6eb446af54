use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::sync::Arc;
use tracing::warn;

/// Header Telegram sends with every webhook call once a secret was registered.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Proof that a webhook request carries the configured secret token.
/// Without a configured secret every request passes.
#[derive(Debug, Clone, Copy)]
pub struct WebhookSecret;

impl FromRequestParts<Arc<crate::AppState>> for WebhookSecret {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.webhook_secret.as_deref() else {
            return Ok(WebhookSecret);
        };

        let presented = parts
            .headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        if presented == Some(expected) {
            Ok(WebhookSecret)
        } else {
            warn!("Webhook call with missing or wrong secret token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
