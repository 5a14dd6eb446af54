pub mod bot;
pub mod telegram;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new().merge(telegram::routes())
}
