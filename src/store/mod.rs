//! System of record for events and participants.
//!
//! Everything above this layer talks to [`EventStore`]; the Postgres
//! implementation is the production path, the in-memory one serves single
//! instance development and the test-suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Event, EventChanges, NewEvent, Participant, ReminderKind, RsvpStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: NewEvent) -> AppResult<Event>;

    /// `NotFound` for unknown ids.
    async fn get_event(&self, id: Uuid) -> AppResult<Event>;

    /// Earliest event starting strictly after `after`.
    async fn next_upcoming(&self, after: DateTime<Utc>) -> AppResult<Option<Event>>;

    async fn list_upcoming(&self, after: DateTime<Utc>, limit: i64) -> AppResult<Vec<Event>>;

    /// Applies only the fields present in `changes`; `NotFound` for unknown ids.
    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Event>;

    /// Removes the event row and returns its last snapshot.
    async fn delete_event(&self, id: Uuid) -> AppResult<Event>;

    /// Events whose `kind` flag is still false and whose start lies strictly
    /// inside `(from, to)`.
    async fn due_for_reminder(
        &self,
        kind: ReminderKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Event>>;

    async fn mark_reminder(&self, id: Uuid, kind: ReminderKind) -> AppResult<()>;

    /// Upsert keyed by (event_id, user_id).
    async fn upsert_participant(
        &self,
        event_id: Uuid,
        user_id: i64,
        display_name: Option<String>,
        status: RsvpStatus,
    ) -> AppResult<Participant>;

    /// Returns the number of removed records; zero is not an error.
    async fn delete_participants(&self, event_id: Uuid) -> AppResult<u64>;

    /// Count of participant records, optionally restricted to one status.
    async fn count_participants(&self, event_id: Uuid, status: Option<RsvpStatus>) -> AppResult<i64>;
}
