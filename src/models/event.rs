use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A scheduled talk or meeting, as stored.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub presenter: Option<String>,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub zoom_join_url: Option<String>,
    pub zoom_meeting_id: Option<String>,
    pub reminder_48h_posted: bool,
    pub reminder_15m_posted: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn reminder_posted(&self, kind: ReminderKind) -> bool {
        match kind {
            ReminderKind::FortyEightHours => self.reminder_48h_posted,
            ReminderKind::FifteenMinutes => self.reminder_15m_posted,
        }
    }
}

/// Row to insert. Reminder flags always start out false.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub presenter: Option<String>,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub conferencing: Option<Conferencing>,
    pub created_by: Option<i64>,
}

/// Link and meeting id travel together: both set or both cleared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conferencing {
    pub join_url: Option<String>,
    pub meeting_id: Option<String>,
}

impl Conferencing {
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Resolved, store-level field changes. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub presenter: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub conferencing: Option<Conferencing>,
}

/// How a patch expresses a new start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StartAt {
    /// User or agent supplied text, still to be normalized.
    Raw(String),
    /// Already computed instant (button shortcuts), stored as is.
    Exact(DateTime<Utc>),
}

/// The single patch request every mutation surface produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub presenter: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<StartAt>,
    pub duration_minutes: Option<i32>,
    pub conferencing_link: Option<String>,
    #[serde(default)]
    pub recreate_conferencing: bool,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == EventPatch::default()
    }

    pub fn start_at(start_at: StartAt) -> Self {
        Self {
            start_at: Some(start_at),
            ..Default::default()
        }
    }

    pub fn recreate_conferencing() -> Self {
        Self {
            recreate_conferencing: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderKind {
    FortyEightHours,
    FifteenMinutes,
}

impl ReminderKind {
    pub fn label(self) -> &'static str {
        match self {
            ReminderKind::FortyEightHours => "48h",
            ReminderKind::FifteenMinutes => "15m",
        }
    }
}
