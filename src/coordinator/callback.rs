//! Inline-button payloads. These strings are stored in already posted chat
//! messages, so the grammar must stay stable:
//!
//! ```text
//! rsvp:<eventId>:<going|maybe|declined>
//! edit:<eventId>[:<shift:<±minutes>|tomorrow:<HH:MM>|zoom|help>]
//! editall:<eventId>
//! editTitle:<eventId>
//! delete:<eventId>
//! ```

use uuid::Uuid;

use crate::models::RsvpStatus;

/// Largest accepted relative shift, one week.
const MAX_SHIFT_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Shift(i64),
    Tomorrow { hour: u32, minute: u32 },
    RegenerateLink,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Rsvp { event_id: Uuid, status: RsvpStatus },
    /// `action: None` opens the edit menu.
    Edit { event_id: Uuid, action: Option<EditAction> },
    EditAll { event_id: Uuid },
    EditTitle { event_id: Uuid },
    Delete { event_id: Uuid },
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let (kind, rest) = data.split_once(':')?;
        match kind {
            "rsvp" => {
                let (id, status) = rest.split_once(':')?;
                Some(CallbackAction::Rsvp {
                    event_id: Uuid::parse_str(id).ok()?,
                    status: status.parse().ok()?,
                })
            }
            "edit" => {
                let (id, action) = match rest.split_once(':') {
                    Some((id, action)) => (id, Some(parse_edit_action(action)?)),
                    None => (rest, None),
                };
                Some(CallbackAction::Edit {
                    event_id: Uuid::parse_str(id).ok()?,
                    action,
                })
            }
            "editall" => Some(CallbackAction::EditAll { event_id: Uuid::parse_str(rest).ok()? }),
            "editTitle" => Some(CallbackAction::EditTitle { event_id: Uuid::parse_str(rest).ok()? }),
            "delete" => Some(CallbackAction::Delete { event_id: Uuid::parse_str(rest).ok()? }),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> String {
        match self {
            CallbackAction::Rsvp { event_id, status } => format!("rsvp:{event_id}:{status}"),
            CallbackAction::Edit { event_id, action: None } => format!("edit:{event_id}"),
            CallbackAction::Edit { event_id, action: Some(action) } => {
                let action = match action {
                    EditAction::Shift(minutes) => format!("shift:{minutes:+}"),
                    EditAction::Tomorrow { hour, minute } => format!("tomorrow:{hour:02}:{minute:02}"),
                    EditAction::RegenerateLink => "zoom".to_string(),
                    EditAction::Help => "help".to_string(),
                };
                format!("edit:{event_id}:{action}")
            }
            CallbackAction::EditAll { event_id } => format!("editall:{event_id}"),
            CallbackAction::EditTitle { event_id } => format!("editTitle:{event_id}"),
            CallbackAction::Delete { event_id } => format!("delete:{event_id}"),
        }
    }

    /// Whether the action changes an event and therefore needs the admin check.
    pub fn is_mutation(&self) -> bool {
        match self {
            CallbackAction::Rsvp { .. } => false,
            CallbackAction::Edit { action, .. } => {
                matches!(action, Some(a) if *a != EditAction::Help)
            }
            CallbackAction::EditAll { .. }
            | CallbackAction::EditTitle { .. }
            | CallbackAction::Delete { .. } => true,
        }
    }
}

fn parse_edit_action(raw: &str) -> Option<EditAction> {
    if let Some(minutes) = raw.strip_prefix("shift:") {
        let minutes: i64 = minutes.parse().ok()?;
        return (minutes.abs() <= MAX_SHIFT_MINUTES).then_some(EditAction::Shift(minutes));
    }
    if let Some(hhmm) = raw.strip_prefix("tomorrow:") {
        let (hour, minute) = hhmm.split_once(':')?;
        let (hour, minute): (u32, u32) = (hour.parse().ok()?, minute.parse().ok()?);
        return (hour < 24 && minute < 60).then_some(EditAction::Tomorrow { hour, minute });
    }
    match raw {
        "zoom" => Some(EditAction::RegenerateLink),
        "help" => Some(EditAction::Help),
        _ => None,
    }
}
