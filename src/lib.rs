pub mod config;
pub mod controllers;
pub mod coordinator;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;
pub mod ui;

use std::sync::Arc;

use coordinator::MutationCoordinator;
use services::telegram::ChatPlatform;

// Shared state for the webhook handlers
pub struct AppState {
    pub coordinator: MutationCoordinator,
    pub platform: Arc<dyn ChatPlatform>,
    pub bot_username: Option<String>,
    pub webhook_secret: Option<String>,
}
