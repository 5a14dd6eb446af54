//! Event lifecycle: create, patch, delete.
//!
//! `apply_patch` is the only way an existing event changes; the agent, the
//! `/edit` command, the wizard and the inline shortcuts all end up here.

use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Conferencing, Event, EventChanges, EventPatch, NewEvent, StartAt};
use crate::services::time::normalize_start_at;
use crate::services::zoom::{ConferencingProvisioner, MeetingRequest};
use crate::store::EventStore;

/// Input for [`EventService::create`]. Duration bounds are enforced by the caller.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub title: String,
    pub start_at: String,
    pub duration_minutes: i32,
    pub presenter: Option<String>,
    pub description: Option<String>,
    pub provision_conferencing: bool,
    pub created_by: Option<i64>,
}

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EventStore>,
    provisioner: Option<Arc<dyn ConferencingProvisioner>>,
    timezone: Tz,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl EventService {
    pub fn new(
        store: Arc<dyn EventStore>,
        provisioner: Option<Arc<dyn ConferencingProvisioner>>,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            provisioner,
            timezone,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Event> {
        self.store.get_event(id).await
    }

    pub async fn next_event(&self) -> AppResult<Option<Event>> {
        self.store.next_upcoming(Utc::now()).await
    }

    pub async fn list_upcoming(&self, limit: i64) -> AppResult<Vec<Event>> {
        self.store.list_upcoming(Utc::now(), limit).await
    }

    /// Provisions the meeting (when asked and configured) before the row is
    /// written, so a failed provisioning leaves nothing behind.
    pub async fn create(&self, request: CreateEvent) -> AppResult<Event> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::ValidationError("an event needs a title".to_string()));
        }
        let start_at = normalize_start_at(&request.start_at, Utc::now(), self.timezone)?;

        let conferencing = if request.provision_conferencing {
            match &self.provisioner {
                Some(provisioner) => {
                    let meeting = provisioner
                        .provision(&MeetingRequest {
                            title: title.clone(),
                            start_at,
                            duration_minutes: request.duration_minutes,
                        })
                        .await?;
                    Some(Conferencing {
                        join_url: Some(meeting.join_url),
                        meeting_id: Some(meeting.meeting_id),
                    })
                }
                None => {
                    warn!(title = %title, "Conferencing requested but no provisioner is configured");
                    None
                }
            }
        } else {
            None
        };

        let event = self
            .store
            .insert_event(NewEvent {
                title,
                presenter: non_blank(request.presenter),
                description: non_blank(request.description),
                start_at,
                duration_minutes: request.duration_minutes,
                conferencing,
                created_by: request.created_by,
            })
            .await?;

        info!(event_id = %event.id, title = %event.title, start_at = %event.start_at, "Event created");
        Ok(event)
    }

    /// Applies the fields present in `patch` to `target`, or to the next
    /// upcoming event when no id is given.
    pub async fn apply_patch(&self, target: Option<Uuid>, patch: EventPatch) -> AppResult<Event> {
        let current = match target {
            Some(id) => self.store.get_event(id).await?,
            None => self
                .store
                .next_upcoming(Utc::now())
                .await?
                .ok_or_else(|| AppError::NotFound("there is no upcoming event".to_string()))?,
        };

        let title = match patch.title {
            Some(title) if title.trim().is_empty() => {
                return Err(AppError::ValidationError("the title must not be empty".to_string()))
            }
            other => other.map(|t| t.trim().to_string()),
        };
        let start_at = match patch.start_at {
            Some(StartAt::Raw(raw)) => Some(normalize_start_at(&raw, Utc::now(), self.timezone)?),
            Some(StartAt::Exact(instant)) => Some(instant),
            None => None,
        };

        let conferencing = if patch.recreate_conferencing {
            // Patched values win over stored ones for the new meeting.
            let request = MeetingRequest {
                title: title.clone().unwrap_or_else(|| current.title.clone()),
                start_at: start_at.unwrap_or(current.start_at),
                duration_minutes: patch.duration_minutes.unwrap_or(current.duration_minutes),
            };
            match &self.provisioner {
                Some(provisioner) => {
                    let meeting = provisioner.provision(&request).await?;
                    Some(Conferencing {
                        join_url: Some(meeting.join_url),
                        meeting_id: Some(meeting.meeting_id),
                    })
                }
                None => {
                    warn!(event_id = %current.id, "No provisioner configured, clearing conferencing link");
                    Some(Conferencing::cleared())
                }
            }
        } else {
            patch.conferencing_link.map(|link| Conferencing {
                join_url: Some(link),
                meeting_id: None,
            })
        };

        let changes = EventChanges {
            title,
            presenter: patch.presenter,
            description: patch.description,
            start_at,
            duration_minutes: patch.duration_minutes,
            conferencing,
        };
        let event = self.store.update_event(current.id, changes).await?;
        info!(event_id = %event.id, "Event updated");
        Ok(event)
    }

    /// Participants go first; an event without participants is fine.
    pub async fn delete(&self, id: Uuid) -> AppResult<Event> {
        let removed = self.store.delete_participants(id).await?;
        let event = self.store.delete_event(id).await?;
        info!(event_id = %id, participants = removed, "Event deleted");
        Ok(event)
    }
}
