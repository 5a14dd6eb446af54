//! Posts the 48 hour and 15 minute reminders to the community chat.
//!
//! Each reminder kind is a one-way flag per event (`pending -> fired`). A tick
//! looks for pending events inside a window rather than at an exact point in
//! time, so a short outage or a slow tick does not lose a reminder:
//!
//! * 48h: start between now+45h and now+48h
//! * 15m: start between now+10m and now+15m
//!
//! The flag is written only after the send succeeded. A failed send leaves the
//! event pending for the next tick; a failed flag write after a good send can
//! produce a duplicate post, which is accepted.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::models::{Event, ReminderKind};
use crate::services::participants::RsvpLedger;
use crate::services::telegram::ChatPlatform;
use crate::store::EventStore;
use crate::ui;

pub struct ReminderScheduler {
    store: Arc<dyn EventStore>,
    ledger: RsvpLedger,
    platform: Arc<dyn ChatPlatform>,
    group_chat_id: Option<i64>,
    timezone: chrono_tz::Tz,
    period: std::time::Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub sent_48h: usize,
    pub sent_15m: usize,
    pub failed: usize,
}

impl TickReport {
    fn record_sent(&mut self, kind: ReminderKind) {
        match kind {
            ReminderKind::FortyEightHours => self.sent_48h += 1,
            ReminderKind::FifteenMinutes => self.sent_15m += 1,
        }
    }
}

/// Exclusive `(from, to)` bounds of the lookahead window for `kind`.
pub fn reminder_window(kind: ReminderKind, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    match kind {
        ReminderKind::FortyEightHours => (now + Duration::hours(45), now + Duration::hours(48)),
        ReminderKind::FifteenMinutes => (now + Duration::minutes(10), now + Duration::minutes(15)),
    }
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn EventStore>,
        platform: Arc<dyn ChatPlatform>,
        group_chat_id: Option<i64>,
        timezone: chrono_tz::Tz,
        period: std::time::Duration,
    ) -> Self {
        Self {
            ledger: RsvpLedger::new(store.clone()),
            store,
            platform,
            group_chat_id,
            timezone,
            period,
        }
    }

    /// Runs forever. Ticks never overlap: a slow tick pushes the next one back.
    pub async fn run(self) {
        if self.group_chat_id.is_none() {
            info!("⏰ No community chat configured, reminder scheduler stays idle");
            return;
        }

        info!(period_secs = self.period.as_secs(), "⏰ Reminder scheduler started");
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let report = self.tick(Utc::now()).await;
            if report != TickReport::default() {
                info!(
                    sent_48h = report.sent_48h,
                    sent_15m = report.sent_15m,
                    failed = report.failed,
                    "⏰ Reminder tick finished"
                );
            }
        }
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        let Some(chat_id) = self.group_chat_id else {
            return report;
        };

        for kind in [ReminderKind::FortyEightHours, ReminderKind::FifteenMinutes] {
            let (from, to) = reminder_window(kind, now);
            let due = match self.store.due_for_reminder(kind, from, to).await {
                Ok(due) => due,
                Err(e) => {
                    error!(kind = kind.label(), error = %e, "Failed to load events due for reminder");
                    report.failed += 1;
                    continue;
                }
            };

            for event in due {
                match self.remind(chat_id, kind, &event).await {
                    Ok(()) => report.record_sent(kind),
                    Err(e) => {
                        warn!(event_id = %event.id, kind = kind.label(), error = %e, "Reminder not sent, will retry");
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }

    async fn remind(&self, chat_id: i64, kind: ReminderKind, event: &Event) -> AppResult<()> {
        let text = match kind {
            ReminderKind::FortyEightHours => {
                let counts = self.ledger.counts_for(event.id).await?;
                ui::reminder_48h_text(event, &counts, self.timezone)
            }
            ReminderKind::FifteenMinutes => ui::reminder_15m_text(event),
        };
        self.platform.send_message(chat_id, &text, None).await?;

        if let Err(e) = self.store.mark_reminder(event.id, kind).await {
            // The post went out; it may be repeated on the next tick.
            error!(event_id = %event.id, kind = kind.label(), error = %e, "Reminder sent but flag not stored");
            return Ok(());
        }
        info!(event_id = %event.id, kind = kind.label(), "Reminder posted");
        Ok(())
    }
}
