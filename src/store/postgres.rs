use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Event, EventChanges, NewEvent, Participant, ReminderKind, RsvpStatus};
use crate::store::EventStore;

const EVENT_COLUMNS: &str = "id, title, presenter, description, start_at, duration_minutes, \
     zoom_join_url, zoom_meeting_id, reminder_48h_posted, reminder_15m_posted, created_by, created_at";

#[derive(Clone)]
pub struct PgEventStore {
    db: Database,
}

#[derive(FromRow)]
struct ParticipantRow {
    event_id: Uuid,
    tg_user_id: i64,
    display_name: Option<String>,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = AppError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        Ok(Participant {
            event_id: row.event_id,
            user_id: row.tg_user_id,
            display_name: row.display_name,
            status: row.status.parse()?,
            updated_at: row.updated_at,
        })
    }
}

impl PgEventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert_event(&self, event: NewEvent) -> AppResult<Event> {
        let conferencing = event.conferencing.unwrap_or_default();
        let query = format!(
            "INSERT INTO events (id, title, presenter, description, start_at, duration_minutes,
                                 zoom_join_url, zoom_meeting_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Event>(&query)
            .bind(Uuid::new_v4())
            .bind(&event.title)
            .bind(&event.presenter)
            .bind(&event.description)
            .bind(event.start_at)
            .bind(event.duration_minutes)
            .bind(&conferencing.join_url)
            .bind(&conferencing.meeting_id)
            .bind(event.created_by)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(row)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Event> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {id} does not exist")))
    }

    async fn next_upcoming(&self, after: DateTime<Utc>) -> AppResult<Option<Event>> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE start_at > $1 ORDER BY start_at, created_at LIMIT 1"
        );
        let row = sqlx::query_as::<_, Event>(&query)
            .bind(after)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(row)
    }

    async fn list_upcoming(&self, after: DateTime<Utc>, limit: i64) -> AppResult<Vec<Event>> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE start_at > $1 ORDER BY start_at, created_at LIMIT $2"
        );
        let rows = sqlx::query_as::<_, Event>(&query)
            .bind(after)
            .bind(limit)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(rows)
    }

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Event> {
        let replace_conferencing = changes.conferencing.is_some();
        let conferencing = changes.conferencing.unwrap_or_default();
        let query = format!(
            "UPDATE events SET
                title            = COALESCE($2, title),
                presenter        = COALESCE($3, presenter),
                description      = COALESCE($4, description),
                start_at         = COALESCE($5, start_at),
                duration_minutes = COALESCE($6, duration_minutes),
                zoom_join_url    = CASE WHEN $7 THEN $8 ELSE zoom_join_url END,
                zoom_meeting_id  = CASE WHEN $7 THEN $9 ELSE zoom_meeting_id END,
                updated_at       = NOW()
             WHERE id = $1
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.presenter)
            .bind(&changes.description)
            .bind(changes.start_at)
            .bind(changes.duration_minutes)
            .bind(replace_conferencing)
            .bind(&conferencing.join_url)
            .bind(&conferencing.meeting_id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {id} does not exist")))
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<Event> {
        let query = format!("DELETE FROM events WHERE id = $1 RETURNING {EVENT_COLUMNS}");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {id} does not exist")))
    }

    async fn due_for_reminder(
        &self,
        kind: ReminderKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Event>> {
        // Column names cannot be bound, so each flag gets its own statement.
        let flag = match kind {
            ReminderKind::FortyEightHours => "reminder_48h_posted",
            ReminderKind::FifteenMinutes => "reminder_15m_posted",
        };
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE {flag} = FALSE AND start_at > $1 AND start_at < $2
             ORDER BY start_at"
        );
        let rows = sqlx::query_as::<_, Event>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(rows)
    }

    async fn mark_reminder(&self, id: Uuid, kind: ReminderKind) -> AppResult<()> {
        let query = match kind {
            ReminderKind::FortyEightHours => "UPDATE events SET reminder_48h_posted = TRUE WHERE id = $1",
            ReminderKind::FifteenMinutes => "UPDATE events SET reminder_15m_posted = TRUE WHERE id = $1",
        };
        let result = sqlx::query(query).bind(id).execute(&self.db.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("event {id} does not exist")));
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
        let row = sqlx::query_as::<_, ParticipantRow>(
            "INSERT INTO participants (event_id, tg_user_id, display_name, status)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (event_id, tg_user_id) DO UPDATE
                SET display_name = EXCLUDED.display_name,
                    status       = EXCLUDED.status,
                    updated_at   = NOW()
             RETURNING event_id, tg_user_id, display_name, status, updated_at",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(&display_name)
        .bind(status.as_str())
        .fetch_one(&self.db.pool)
        .await?;
        row.try_into()
    }

    async fn delete_participants(&self, event_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM participants WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_participants(&self, event_id: Uuid, status: Option<RsvpStatus>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM participants
             WHERE event_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(event_id)
        .bind(status.map(RsvpStatus::as_str))
        .fetch_one(&self.db.pool)
        .await?;
        Ok(count)
    }
}
