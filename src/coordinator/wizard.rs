//! Guided edit dialogue: one field per message, applied as a single patch at
//! the end.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coordinator::command::parse_duration;
use crate::error::{AppError, AppResult};
use crate::models::{EventPatch, StartAt};
use crate::services::time::normalize_start_at;

/// Answer that leaves the current field unchanged.
pub const SKIP_TOKEN: &str = "-";

const REGENERATE_WORDS: [&str; 4] = ["new", "neu", "regenerate", "yes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Title,
    Description,
    StartAt,
    DurationMinutes,
    Presenter,
    ConferencingLink,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardMode {
    /// Every field in order.
    Full,
    /// Only the title, started from the "✏️ Title" button.
    TitleOnly,
}

impl WizardStep {
    pub fn next(self, mode: WizardMode) -> WizardStep {
        if mode == WizardMode::TitleOnly {
            return WizardStep::Confirm;
        }
        match self {
            WizardStep::Title => WizardStep::Description,
            WizardStep::Description => WizardStep::StartAt,
            WizardStep::StartAt => WizardStep::DurationMinutes,
            WizardStep::DurationMinutes => WizardStep::Presenter,
            WizardStep::Presenter => WizardStep::ConferencingLink,
            WizardStep::ConferencingLink | WizardStep::Confirm => WizardStep::Confirm,
        }
    }
}

/// Per-user wizard state as kept in the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEdit {
    pub event_id: Uuid,
    pub step: WizardStep,
    pub mode: WizardMode,
    pub patch: EventPatch,
}

impl PendingEdit {
    pub fn new(event_id: Uuid, mode: WizardMode) -> Self {
        Self {
            event_id,
            step: WizardStep::Title,
            mode,
            patch: EventPatch::default(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.step == WizardStep::Confirm
    }

    /// Records the answer for the current step and moves on. On error the
    /// step stays where it was so the same question can be asked again.
    pub fn accept(&mut self, input: &str, now: DateTime<Utc>, tz: Tz) -> AppResult<()> {
        let input = input.trim();
        if self.step == WizardStep::Confirm {
            return Err(AppError::StateError("this edit is already complete".to_string()));
        }
        if input != SKIP_TOKEN {
            self.record(input, now, tz)?;
        }
        self.step = self.step.next(self.mode);
        Ok(())
    }

    fn record(&mut self, input: &str, now: DateTime<Utc>, tz: Tz) -> AppResult<()> {
        match self.step {
            WizardStep::Title => {
                if input.is_empty() {
                    return Err(AppError::ValidationError("the title must not be empty".to_string()));
                }
                self.patch.title = Some(input.to_string());
            }
            WizardStep::Description => self.patch.description = Some(input.to_string()),
            WizardStep::StartAt => {
                let instant = normalize_start_at(input, now, tz)?;
                self.patch.start_at = Some(StartAt::Exact(instant));
            }
            WizardStep::DurationMinutes => self.patch.duration_minutes = Some(parse_duration(input)?),
            WizardStep::Presenter => self.patch.presenter = Some(input.to_string()),
            WizardStep::ConferencingLink => {
                let lowered = input.to_lowercase();
                if REGENERATE_WORDS.contains(&lowered.as_str()) {
                    self.patch.recreate_conferencing = true;
                } else if lowered.starts_with("https://") || lowered.starts_with("http://") {
                    self.patch.conferencing_link = Some(input.to_string());
                } else {
                    return Err(AppError::StateError(
                        "send a link starting with https://, \"new\" or \"-\"".to_string(),
                    ));
                }
            }
            WizardStep::Confirm => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    fn answer(edit: &mut PendingEdit, input: &str) -> AppResult<()> {
        edit.accept(input, now(), chrono_tz::Europe::Berlin)
    }

    #[test]
    fn skipping_every_step_yields_an_empty_patch() {
        let mut edit = PendingEdit::new(Uuid::new_v4(), WizardMode::Full);
        let mut asked = vec![edit.step];
        while !edit.is_complete() {
            answer(&mut edit, "-").unwrap();
            asked.push(edit.step);
        }
        assert_eq!(
            asked,
            vec![
                WizardStep::Title,
                WizardStep::Description,
                WizardStep::StartAt,
                WizardStep::DurationMinutes,
                WizardStep::Presenter,
                WizardStep::ConferencingLink,
                WizardStep::Confirm,
            ]
        );
        assert!(edit.patch.is_empty());
    }

    #[test]
    fn collects_answers_into_the_patch() {
        let mut edit = PendingEdit::new(Uuid::new_v4(), WizardMode::Full);
        for input in ["Async Rust", "-", "2025-10-01 19:00", "45", "Alex", "new"] {
            answer(&mut edit, input).unwrap();
        }
        assert!(edit.is_complete());
        assert_eq!(edit.patch.title.as_deref(), Some("Async Rust"));
        assert_eq!(edit.patch.description, None);
        assert_eq!(
            edit.patch.start_at,
            Some(StartAt::Exact(Utc.with_ymd_and_hms(2025, 10, 1, 17, 0, 0).unwrap()))
        );
        assert_eq!(edit.patch.duration_minutes, Some(45));
        assert_eq!(edit.patch.presenter.as_deref(), Some("Alex"));
        assert!(edit.patch.recreate_conferencing);
    }

    #[test]
    fn invalid_date_or_duration_repeats_the_step() {
        let mut edit = PendingEdit::new(Uuid::new_v4(), WizardMode::Full);
        answer(&mut edit, "-").unwrap();
        answer(&mut edit, "-").unwrap();
        assert!(matches!(answer(&mut edit, "next friday-ish"), Err(AppError::ValidationError(_))));
        assert_eq!(edit.step, WizardStep::StartAt);
        answer(&mut edit, "-").unwrap();
        assert!(matches!(answer(&mut edit, "forever"), Err(AppError::ValidationError(_))));
        assert!(matches!(answer(&mut edit, "10"), Err(AppError::ValidationError(_))));
        assert_eq!(edit.step, WizardStep::DurationMinutes);
    }

    #[test]
    fn link_step_accepts_urls_and_rejects_noise() {
        let mut edit = PendingEdit {
            step: WizardStep::ConferencingLink,
            ..PendingEdit::new(Uuid::new_v4(), WizardMode::Full)
        };
        assert!(matches!(answer(&mut edit, "zoom please"), Err(AppError::StateError(_))));
        answer(&mut edit, "https://meet.example.org/abc").unwrap();
        assert_eq!(edit.patch.conferencing_link.as_deref(), Some("https://meet.example.org/abc"));
        assert!(!edit.patch.recreate_conferencing);
        assert!(edit.is_complete());
    }

    #[test]
    fn title_only_mode_finishes_after_one_answer() {
        let mut edit = PendingEdit::new(Uuid::new_v4(), WizardMode::TitleOnly);
        answer(&mut edit, "Renamed").unwrap();
        assert!(edit.is_complete());
        assert!(matches!(answer(&mut edit, "again"), Err(AppError::StateError(_))));
    }

    #[test]
    fn survives_a_json_round_trip_for_external_sessions() {
        let mut edit = PendingEdit::new(Uuid::new_v4(), WizardMode::Full);
        answer(&mut edit, "Title").unwrap();
        let json = serde_json::to_string(&edit).unwrap();
        assert_eq!(serde_json::from_str::<PendingEdit>(&json).unwrap(), edit);
    }
}
