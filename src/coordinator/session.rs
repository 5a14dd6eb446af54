//! Where wizard state lives between messages. Entries expire after the
//! configured TTL; every write restarts the clock.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::coordinator::wizard::PendingEdit;
use crate::error::AppResult;
use crate::redis_client::RedisClient;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: i64) -> AppResult<Option<PendingEdit>>;
    async fn set(&self, user_id: i64, edit: &PendingEdit) -> AppResult<()>;
    async fn delete(&self, user_id: i64) -> AppResult<()>;
}

/// Single-instance store.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<i64, (Instant, PendingEdit)>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, user_id: i64) -> AppResult<Option<PendingEdit>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&user_id) {
            Some((expires_at, _)) if *expires_at <= Instant::now() => {
                debug!(user_id, "Wizard session expired");
                sessions.remove(&user_id);
                Ok(None)
            }
            Some((_, edit)) => Ok(Some(edit.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, user_id: i64, edit: &PendingEdit) -> AppResult<()> {
        let expires_at = Instant::now() + self.ttl;
        self.sessions
            .write()
            .await
            .insert(user_id, (expires_at, edit.clone()));
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> AppResult<()> {
        self.sessions.write().await.remove(&user_id);
        Ok(())
    }
}

/// Shared store for several bot instances behind one webhook.
pub struct RedisSessionStore {
    redis: RedisClient,
    ttl: Duration,
}

impl RedisSessionStore {
    pub fn new(redis: RedisClient, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    fn key(user_id: i64) -> String {
        format!("wizard:{}", user_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, user_id: i64) -> AppResult<Option<PendingEdit>> {
        let mut conn = self.redis.conn.clone();
        let raw: Option<String> = conn.get(Self::key(user_id)).await?;
        let Some(json) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(edit) => Ok(Some(edit)),
            Err(e) => {
                warn!(user_id, error = %e, "Dropping undecodable wizard session");
                if let Err(e) = conn.del::<_, ()>(Self::key(user_id)).await {
                    warn!(user_id, error = %e, "Failed to delete undecodable wizard session");
                }
                Ok(None)
            }
        }
    }

    async fn set(&self, user_id: i64, edit: &PendingEdit) -> AppResult<()> {
        let json = serde_json::to_string(edit)?;
        let mut conn = self.redis.conn.clone();
        let _: () = conn
            .set_ex(Self::key(user_id), json, self.ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> AppResult<()> {
        let mut conn = self.redis.conn.clone();
        let _: () = conn.del(Self::key(user_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::wizard::WizardMode;
    use uuid::Uuid;

    #[tokio::test]
    async fn memory_sessions_expire() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        let edit = PendingEdit::new(Uuid::new_v4(), WizardMode::Full);
        store.set(7, &edit).await.unwrap();
        assert_eq!(store.get(7).await.unwrap(), Some(edit));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get(7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_drops_the_session() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store
            .set(1, &PendingEdit::new(Uuid::new_v4(), WizardMode::TitleOnly))
            .await
            .unwrap();
        store.delete(1).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), None);
    }
}
