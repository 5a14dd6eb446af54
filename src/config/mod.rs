use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Top-level configuration: one section per collaborator
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub telegram: TelegramConfig,
    pub openai: OpenAiConfig,
    pub zoom: Option<ZoomConfig>,
    pub scheduler: SchedulerConfig,
    pub community: CommunityConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

// Without a URL the bot keeps events in process memory
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

// Without a URL wizard sessions live in process memory
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub session_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    pub bot_username: Option<String>,
    /// The community chat. `None` disables reminders and admin gating.
    pub group_chat_id: Option<i64>,
    pub webhook_secret: Option<String>,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ZoomConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub oauth_base: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick: Duration,
}

#[derive(Debug, Clone)]
pub struct CommunityConfig {
    pub timezone: Tz,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{name} must be valid ({e}), got '{raw}'"))
}

/// Empty or non-numeric values mean "no community chat configured".
fn parse_group_chat_id(raw: Option<String>) -> Option<i64> {
    raw.and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let zoom = match (
            optional_var("ZOOM_ACCOUNT_ID"),
            optional_var("ZOOM_CLIENT_ID"),
            optional_var("ZOOM_CLIENT_SECRET"),
        ) {
            (Some(account_id), Some(client_id), Some(client_secret)) => Some(ZoomConfig {
                account_id,
                client_id,
                client_secret,
                oauth_base: var_or("ZOOM_OAUTH_BASE", "https://zoom.us"),
                api_base: var_or("ZOOM_API_BASE", "https://api.zoom.us/v2"),
            }),
            _ => None,
        };

        let timezone_name = var_or("COMMUNITY_TIMEZONE", "Europe/Berlin");
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow!("COMMUNITY_TIMEZONE '{timezone_name}' is not an IANA zone: {e}"))?;

        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_var("PORT", "8000")?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "meetup_bot=debug,tower_http=info"),
            },
            database: DatabaseConfig {
                url: optional_var("DATABASE_URL"),
                pool_size: parse_var("DB_POOL_SIZE", "10")?,
            },
            redis: RedisConfig {
                url: optional_var("REDIS_URL"),
                session_ttl: Duration::from_secs(
                    60 * parse_var::<u64>("WIZARD_SESSION_TTL_MINUTES", "30")?,
                ),
            },
            telegram: TelegramConfig {
                bot_token: optional_var("TELEGRAM_BOT_TOKEN")
                    .context("TELEGRAM_BOT_TOKEN must be set")?,
                api_base: var_or("TELEGRAM_API_BASE", "https://api.telegram.org"),
                bot_username: optional_var("TELEGRAM_BOT_USERNAME")
                    .map(|name| name.trim_start_matches('@').to_string()),
                group_chat_id: parse_group_chat_id(optional_var("GROUP_CHAT_ID")),
                webhook_secret: optional_var("TELEGRAM_WEBHOOK_SECRET"),
                webhook_url: optional_var("TELEGRAM_WEBHOOK_URL"),
            },
            openai: OpenAiConfig {
                api_key: optional_var("OPENAI_API_KEY"),
                api_base: var_or("OPENAI_API_BASE", "https://api.openai.com/v1"),
                model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
                timeout: Duration::from_secs(parse_var("OPENAI_TIMEOUT_SECONDS", "30")?),
            },
            zoom,
            scheduler: SchedulerConfig {
                tick: Duration::from_secs(parse_var::<u64>("REMINDER_TICK_SECONDS", "60")?.max(1)),
            },
            community: CommunityConfig { timezone },
        })
    }
}
