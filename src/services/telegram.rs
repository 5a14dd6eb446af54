use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use crate::ui::InlineKeyboard;

/// Membership status as reported by the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberRole {
    pub fn is_elevated(self) -> bool {
        matches!(self, MemberRole::Creator | MemberRole::Administrator)
    }

    fn from_status(status: &str) -> Self {
        match status {
            "creator" => MemberRole::Creator,
            "administrator" => MemberRole::Administrator,
            "member" => MemberRole::Member,
            "restricted" => MemberRole::Restricted,
            "kicked" => MemberRole::Kicked,
            _ => MemberRole::Left,
        }
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> AppResult<()>;

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> AppResult<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) -> AppResult<()>;

    async fn member_role(&self, chat_id: i64, user_id: i64) -> AppResult<MemberRole>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}

/// Telegram Bot API over plain HTTPS.
#[derive(Clone)]
pub struct TelegramClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn from_config(config: &TelegramConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http_client,
            base_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> AppResult<T> {
        debug!(method, "Telegram API call");
        let response: ApiResponse<T> = self
            .http_client
            .post(format!("{}/{}", self.base_url, method))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(AppError::UpstreamError(format!(
                "telegram {method} failed: {}",
                response.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> AppResult<()> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
            "drop_pending_updates": true,
        });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", body).await?;
        info!(url, "Telegram webhook registered");
        Ok(())
    }
}

fn with_keyboard(mut body: Value, keyboard: Option<&InlineKeyboard>) -> AppResult<Value> {
    if let Some(keyboard) = keyboard {
        body["reply_markup"] = serde_json::to_value(keyboard)?;
    }
    Ok(body)
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> AppResult<()> {
        let body = with_keyboard(json!({ "chat_id": chat_id, "text": text }), keyboard)?;
        let _: Value = self.call("sendMessage", body).await?;
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> AppResult<()> {
        let body = with_keyboard(
            json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            keyboard,
        )?;
        let _: Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) -> AppResult<()> {
        let mut body = json!({ "callback_query_id": callback_id, "show_alert": show_alert });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    async fn member_role(&self, chat_id: i64, user_id: i64) -> AppResult<MemberRole> {
        let member: ChatMember = self
            .call("getChatMember", json!({ "chat_id": chat_id, "user_id": user_id }))
            .await?;
        Ok(MemberRole::from_status(&member.status))
    }
}
