use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::controllers::bot;
use crate::middleware::WebhookSecret;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/telegram/webhook", post(webhook))
}

/// The subset of a Telegram `Update` the bot reacts to.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    pub fn display_name(&self) -> Option<String> {
        let name = self.first_name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            Some(name.to_string())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Acknowledges right away and handles the update in the background, so a
/// slow agent call never makes Telegram retry the delivery.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    _secret: WebhookSecret,
    Json(update): Json<Update>,
) -> StatusCode {
    debug!(update_id = update.update_id, "Update received");
    tokio::spawn(async move {
        bot::dispatch(&state, update).await;
    });
    StatusCode::OK
}
