use anyhow::Context;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meetup_bot::{
    config::{AppConfig, Config},
    controllers,
    coordinator::session::{MemorySessionStore, RedisSessionStore, SessionStore},
    coordinator::MutationCoordinator,
    database::Database,
    redis_client::RedisClient,
    services::agent::{Agent, OpenAiAgent},
    services::events::EventService,
    services::participants::RsvpLedger,
    services::scheduler::ReminderScheduler,
    services::telegram::{ChatPlatform, TelegramClient},
    services::zoom::{ConferencingProvisioner, ZoomClient},
    store::{EventStore, MemoryEventStore, PgEventStore},
    AppState,
};

fn init_tracing(app: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::new(&app.rust_log);
    if app.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(&config.app);

    info!(timezone = %config.community.timezone, "Starting meetup bot");

    // Event store: Postgres when configured, process memory otherwise
    let store: Arc<dyn EventStore> = match &config.database.url {
        Some(url) => {
            let db = Database::connect(url, config.database.pool_size)
                .await
                .context("Failed to connect to database")?;
            db.run_migrations().await.context("Failed to run migrations")?;
            info!("Database connected");
            Arc::new(PgEventStore::new(db))
        }
        None => {
            warn!("DATABASE_URL not set, events live in process memory only");
            Arc::new(MemoryEventStore::new())
        }
    };

    // Wizard sessions: Redis when configured
    let sessions: Arc<dyn SessionStore> = match &config.redis.url {
        Some(url) => {
            let redis = RedisClient::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis connected");
            Arc::new(RedisSessionStore::new(redis, config.redis.session_ttl))
        }
        None => Arc::new(MemorySessionStore::new(config.redis.session_ttl)),
    };

    let telegram = TelegramClient::from_config(&config.telegram)?;
    match &config.telegram.webhook_url {
        Some(url) => {
            if let Err(e) = telegram
                .set_webhook(url, config.telegram.webhook_secret.as_deref())
                .await
            {
                error!(error = %e, "Webhook registration failed, keeping the existing one");
            }
        }
        None => warn!(
            "TELEGRAM_WEBHOOK_URL not set, updates only arrive if a webhook was registered elsewhere"
        ),
    }
    let platform: Arc<dyn ChatPlatform> = Arc::new(telegram);

    let provisioner: Option<Arc<dyn ConferencingProvisioner>> = match config.zoom.clone() {
        Some(zoom) => Some(Arc::new(ZoomClient::from_config(zoom)?)),
        None => {
            warn!("Zoom credentials not set, events are created without meeting links");
            None
        }
    };

    let agent: Option<Arc<dyn Agent>> = match config.openai.api_key.clone() {
        Some(key) => Some(Arc::new(OpenAiAgent::from_config(&config.openai, key)?)),
        None => {
            warn!("OPENAI_API_KEY not set, free-form messages get a fallback reply");
            None
        }
    };

    let timezone = config.community.timezone;
    let group_chat_id = config.telegram.group_chat_id;

    let coordinator = MutationCoordinator::new(
        EventService::new(store.clone(), provisioner, timezone),
        RsvpLedger::new(store.clone()),
        platform.clone(),
        agent,
        sessions,
        group_chat_id,
    );

    let app_state = Arc::new(AppState {
        coordinator,
        platform: platform.clone(),
        bot_username: config.telegram.bot_username.clone(),
        webhook_secret: config.telegram.webhook_secret.clone(),
    });

    // --- Background reminders ---
    let scheduler = ReminderScheduler::new(store, platform, group_chat_id, timezone, config.scheduler.tick);
    task::spawn(scheduler.run());

    // --- Web server ---
    let app = Router::new()
        .route("/", get(|| async { "Meetup bot" }))
        .route("/health", get(|| async { "OK" }))
        .merge(controllers::routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
