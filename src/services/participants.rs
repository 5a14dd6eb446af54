use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Participant, RsvpCounts, RsvpStatus};
use crate::store::EventStore;

/// RSVP bookkeeping. Counts are always read from the store, never cached.
#[derive(Clone)]
pub struct RsvpLedger {
    store: Arc<dyn EventStore>,
}

impl RsvpLedger {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn set_participant(
        &self,
        event_id: Uuid,
        user_id: i64,
        display_name: Option<String>,
        status: RsvpStatus,
    ) -> AppResult<Participant> {
        let row = self
            .store
            .upsert_participant(event_id, user_id, display_name, status)
            .await?;
        info!(event_id = %event_id, user_id, status = %status, "RSVP stored");
        Ok(row)
    }

    pub async fn counts_for(&self, event_id: Uuid) -> AppResult<RsvpCounts> {
        let (going, maybe, total) = futures::try_join!(
            self.store.count_participants(event_id, Some(RsvpStatus::Going)),
            self.store.count_participants(event_id, Some(RsvpStatus::Maybe)),
            self.store.count_participants(event_id, None),
        )?;
        Ok(RsvpCounts { going, maybe, total })
    }
}
