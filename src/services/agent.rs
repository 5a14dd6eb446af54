//! Free-form surface: an LLM decides the intent and answers with at most one
//! tool call. Only the decoded tool call is ever allowed to touch state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::OpenAiConfig;
use crate::error::{AppError, AppResult};
use crate::models::{EventPatch, RsvpStatus, StartAt};
use crate::services::time::format_utc;

#[derive(Debug, Clone)]
pub struct AgentContext {
    pub user_id: i64,
    pub display_name: Option<String>,
    pub now: DateTime<Utc>,
    pub timezone: Tz,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    Text(String),
    Tool(ToolCall),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    EventsCreate(EventsCreateArgs),
    EventsUpdate(EventsUpdateArgs),
    ParticipantsSet(ParticipantsSetArgs),
    EventsStatusNext,
    EventsList { limit: Option<i64> },
    AnnounceToGroup { text: String },
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct EventsCreateArgs {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    pub start_at: String,
    #[validate(range(min = 15, max = 240, message = "duration must be 15-240 minutes"))]
    pub duration_minutes: i32,
    pub presenter: Option<String>,
    pub description: Option<String>,
    pub create_zoom: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct UpdatePatchArgs {
    pub title: Option<String>,
    pub start_at: Option<String>,
    #[validate(range(min = 15, max = 240, message = "duration must be 15-240 minutes"))]
    pub duration_minutes: Option<i32>,
    pub presenter: Option<String>,
    pub description: Option<String>,
    pub recreate_zoom: Option<bool>,
}

impl From<UpdatePatchArgs> for EventPatch {
    fn from(args: UpdatePatchArgs) -> Self {
        EventPatch {
            title: args.title,
            presenter: args.presenter,
            description: args.description,
            start_at: args.start_at.map(StartAt::Raw),
            duration_minutes: args.duration_minutes,
            conferencing_link: None,
            recreate_conferencing: args.recreate_zoom.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct EventsUpdateArgs {
    pub id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub patch: UpdatePatchArgs,
}

impl EventsUpdateArgs {
    /// `None` means "the next upcoming event".
    pub fn target(&self) -> AppResult<Option<Uuid>> {
        match self.id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| AppError::NotFound(format!("no event with id '{raw}'"))),
        }
    }
}

/// The model may fill in user fields; they are ignored in favour of the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParticipantsSetArgs {
    pub event_id: String,
    pub status: RsvpStatus,
    pub tg_user_id: Option<i64>,
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListArgs {
    limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnnounceArgs {
    #[serde(default)]
    text: String,
}

fn validated<T: Validate>(args: T) -> AppResult<T> {
    args.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    Ok(args)
}

/// Tool arguments come from the model, so a payload that does not decode
/// is a bad request, not an outage.
fn decode<T: DeserializeOwned>(name: &str, arguments: &str) -> AppResult<T> {
    serde_json::from_str(arguments)
        .map_err(|e| AppError::ValidationError(format!("invalid arguments for {name}: {e}")))
}

impl ToolCall {
    pub fn parse(name: &str, arguments: &str) -> AppResult<ToolCall> {
        let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
        let call = match name {
            "events_create" => ToolCall::EventsCreate(validated(decode(name, arguments)?)?),
            "events_update" => ToolCall::EventsUpdate(validated(decode(name, arguments)?)?),
            "participants_set" => ToolCall::ParticipantsSet(decode(name, arguments)?),
            "events_status_next" => ToolCall::EventsStatusNext,
            "events_list" => {
                let args: ListArgs = decode(name, arguments)?;
                ToolCall::EventsList { limit: args.limit }
            }
            "announce_to_group" => {
                let args: AnnounceArgs = decode(name, arguments)?;
                ToolCall::AnnounceToGroup { text: args.text }
            }
            other => ToolCall::Unknown(other.to_string()),
        };
        Ok(call)
    }
}

/// Names and argument schemas the agent may call.
pub fn tool_catalog() -> Value {
    json!([
        { "type": "function", "function": {
            "name": "events_create",
            "description": "Create an event (optionally with a Zoom meeting).",
            "parameters": { "type": "object", "properties": {
                "title": { "type": "string" },
                "start_at": { "type": "string", "format": "date-time" },
                "duration_minutes": { "type": "integer", "minimum": 15, "maximum": 240 },
                "presenter": { "type": "string" },
                "description": { "type": "string" },
                "create_zoom": { "type": "boolean", "default": true }
            }, "required": ["title", "start_at", "duration_minutes", "presenter"] }
        }},
        { "type": "function", "function": {
            "name": "events_update",
            "description": "Update an existing event. Without id the next upcoming event is edited.",
            "parameters": { "type": "object", "properties": {
                "id": { "type": "string", "description": "Event id (optional). Empty means the next event." },
                "patch": { "type": "object", "properties": {
                    "title": { "type": "string" },
                    "start_at": { "type": "string", "format": "date-time" },
                    "duration_minutes": { "type": "integer", "minimum": 15, "maximum": 240 },
                    "presenter": { "type": "string" },
                    "description": { "type": "string" },
                    "recreate_zoom": { "type": "boolean", "description": "If true, create a new Zoom invitation." }
                } }
            }, "required": ["patch"] }
        }},
        { "type": "function", "function": {
            "name": "participants_set",
            "description": "Set the caller's attendance status.",
            "parameters": { "type": "object", "properties": {
                "event_id": { "type": "string" },
                "tg_user_id": { "type": "integer" },
                "display_name": { "type": "string" },
                "status": { "type": "string", "enum": ["going", "maybe", "declined"] }
            }, "required": ["event_id", "tg_user_id", "status"] }
        }},
        { "type": "function", "function": {
            "name": "events_status_next",
            "description": "Status of the next event.",
            "parameters": { "type": "object", "properties": {} }
        }},
        { "type": "function", "function": {
            "name": "events_list",
            "description": "List upcoming events.",
            "parameters": { "type": "object", "properties": {
                "limit": { "type": "integer", "minimum": 1, "maximum": 10, "default": 5 }
            }, "required": [] }
        }},
        { "type": "function", "function": {
            "name": "announce_to_group",
            "description": "Return text for a group announcement.",
            "parameters": { "type": "object", "properties": {
                "text": { "type": "string" }
            }, "required": ["text"] }
        }}
    ])
}

fn system_prompt(ctx: &AgentContext) -> String {
    format!(
        "You are the organizing assistant of our tech chat group.\n\
         - Now is {} (UTC).\n\
         - Community timezone is {}; give times as ISO-8601 UTC when calling tools.\n\
         - Use only the provided tools.\n\
         - If required fields are missing, ask briefly. No long paragraphs.",
        format_utc(ctx.now),
        ctx.timezone
    )
}

#[async_trait]
pub trait Agent: Send + Sync {
    async fn decide(&self, utterance: &str, ctx: &AgentContext) -> AppResult<AgentReply>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    function: RawFunction,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// OpenAI-compatible Chat Completions client.
pub struct OpenAiAgent {
    http_client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiAgent {
    pub fn from_config(config: &OpenAiConfig, api_key: String) -> AppResult<Self> {
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Agent for OpenAiAgent {
    async fn decide(&self, utterance: &str, ctx: &AgentContext) -> AppResult<AgentReply> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt(ctx) },
                { "role": "user", "content": utterance }
            ],
            "tools": tool_catalog(),
            "tool_choice": "auto",
        });

        let response: CompletionResponse = self
            .http_client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| AppError::UpstreamError("agent returned no choices".to_string()))?;

        if message.tool_calls.len() > 1 {
            warn!(count = message.tool_calls.len(), "Agent returned several tool calls, using the first");
        }
        match message.tool_calls.into_iter().next() {
            Some(call) => {
                debug!(tool = %call.function.name, "Agent selected tool");
                ToolCall::parse(&call.function.name, &call.function.arguments).map(AgentReply::Tool)
            }
            None => Ok(AgentReply::Text(
                message
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "✅".to_string()),
            )),
        }
    }
}
