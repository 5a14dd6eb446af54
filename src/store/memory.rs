use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Event, EventChanges, NewEvent, Participant, ReminderKind, RsvpStatus};
use crate::store::EventStore;

/// Process-local store with the same semantics as the Postgres tables.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<Uuid, Event>>,
    participants: RwLock<HashMap<(Uuid, i64), Participant>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of participant rows across all events.
    pub async fn participant_rows(&self) -> usize {
        self.participants.read().await.len()
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("event {id} does not exist"))
}

fn upcoming(events: &HashMap<Uuid, Event>, after: DateTime<Utc>) -> Vec<Event> {
    let mut rows: Vec<Event> = events
        .values()
        .filter(|e| e.start_at > after)
        .cloned()
        .collect();
    rows.sort_by_key(|e| (e.start_at, e.created_at));
    rows
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert_event(&self, event: NewEvent) -> AppResult<Event> {
        let conferencing = event.conferencing.unwrap_or_default();
        let row = Event {
            id: Uuid::new_v4(),
            title: event.title,
            presenter: event.presenter,
            description: event.description,
            start_at: event.start_at,
            duration_minutes: event.duration_minutes,
            zoom_join_url: conferencing.join_url,
            zoom_meeting_id: conferencing.meeting_id,
            reminder_48h_posted: false,
            reminder_15m_posted: false,
            created_by: event.created_by,
            created_at: Utc::now(),
        };
        self.events.write().await.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Event> {
        self.events
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn next_upcoming(&self, after: DateTime<Utc>) -> AppResult<Option<Event>> {
        Ok(upcoming(&*self.events.read().await, after).into_iter().next())
    }

    async fn list_upcoming(&self, after: DateTime<Utc>, limit: i64) -> AppResult<Vec<Event>> {
        let mut rows = upcoming(&*self.events.read().await, after);
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Event> {
        let mut events = self.events.write().await;
        let event = events.get_mut(&id).ok_or_else(|| not_found(id))?;
        if let Some(title) = changes.title {
            event.title = title;
        }
        if let Some(presenter) = changes.presenter {
            event.presenter = Some(presenter);
        }
        if let Some(description) = changes.description {
            event.description = Some(description);
        }
        if let Some(start_at) = changes.start_at {
            event.start_at = start_at;
        }
        if let Some(duration) = changes.duration_minutes {
            event.duration_minutes = duration;
        }
        if let Some(conferencing) = changes.conferencing {
            event.zoom_join_url = conferencing.join_url;
            event.zoom_meeting_id = conferencing.meeting_id;
        }
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<Event> {
        let removed = self.events.write().await.remove(&id).ok_or_else(|| not_found(id))?;
        // Mirrors ON DELETE CASCADE.
        self.participants.write().await.retain(|(event_id, _), _| *event_id != id);
        Ok(removed)
    }

    async fn due_for_reminder(
        &self,
        kind: ReminderKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Event>> {
        let mut rows: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| !e.reminder_posted(kind) && e.start_at > from && e.start_at < to)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.start_at);
        Ok(rows)
    }

    async fn mark_reminder(&self, id: Uuid, kind: ReminderKind) -> AppResult<()> {
        let mut events = self.events.write().await;
        let event = events.get_mut(&id).ok_or_else(|| not_found(id))?;
        match kind {
            ReminderKind::FortyEightHours => event.reminder_48h_posted = true,
            ReminderKind::FifteenMinutes => event.reminder_15m_posted = true,
        }
        Ok(())
    }

    async fn upsert_participant(
        &self,
        event_id: Uuid,
        user_id: i64,
        display_name: Option<String>,
        status: RsvpStatus,
    ) -> AppResult<Participant> {
        if !self.events.read().await.contains_key(&event_id) {
            return Err(not_found(event_id));
        }
        let row = Participant {
            event_id,
            user_id,
            display_name,
            status,
            updated_at: Utc::now(),
        };
        self.participants
            .write()
            .await
            .insert((event_id, user_id), row.clone());
        Ok(row)
    }

    async fn delete_participants(&self, event_id: Uuid) -> AppResult<u64> {
        let mut participants = self.participants.write().await;
        let before = participants.len();
        participants.retain(|(id, _), _| *id != event_id);
        Ok((before - participants.len()) as u64)
    }

    async fn count_participants(&self, event_id: Uuid, status: Option<RsvpStatus>) -> AppResult<i64> {
        let count = self
            .participants
            .read()
            .await
            .values()
            .filter(|p| p.event_id == event_id && status.map_or(true, |s| p.status == s))
            .count();
        Ok(count as i64)
    }
}
