use serde::Serialize;
use uuid::Uuid;

use crate::coordinator::callback::{CallbackAction, EditAction};
use crate::models::RsvpStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

/// Telegram `InlineKeyboardMarkup`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

fn button(text: &str, action: CallbackAction) -> InlineButton {
    InlineButton {
        text: text.to_string(),
        callback_data: action.to_payload(),
    }
}

fn edit(event_id: Uuid, action: EditAction) -> CallbackAction {
    CallbackAction::Edit { event_id, action: Some(action) }
}

/// RSVP row plus the most common management buttons, shown under event cards.
pub fn action_keyboard(event_id: Uuid) -> InlineKeyboard {
    let rsvp = |status| CallbackAction::Rsvp { event_id, status };
    InlineKeyboard {
        inline_keyboard: vec![
            vec![
                button("✅ Going", rsvp(RsvpStatus::Going)),
                button("❔ Maybe", rsvp(RsvpStatus::Maybe)),
                button("🚫 Decline", rsvp(RsvpStatus::Declined)),
            ],
            vec![
                button("📝 Edit all", CallbackAction::EditAll { event_id }),
                button("✏️ Title", CallbackAction::EditTitle { event_id }),
                button("🗑️ Delete", CallbackAction::Delete { event_id }),
            ],
            vec![button("⚙️ More", CallbackAction::Edit { event_id, action: None })],
        ],
    }
}

pub fn edit_menu_keyboard(event_id: Uuid) -> InlineKeyboard {
    InlineKeyboard {
        inline_keyboard: vec![
            vec![
                button("⏪ -15 min", edit(event_id, EditAction::Shift(-15))),
                button("⏩ +15 min", edit(event_id, EditAction::Shift(15))),
            ],
            vec![
                button("🌅 Tomorrow 19:00", edit(event_id, EditAction::Tomorrow { hour: 19, minute: 0 })),
                button("🔗 New link", edit(event_id, EditAction::RegenerateLink)),
            ],
            vec![
                button("✏️ Title", CallbackAction::EditTitle { event_id }),
                button("📝 Edit all", CallbackAction::EditAll { event_id }),
            ],
            vec![
                button("🗑️ Delete", CallbackAction::Delete { event_id }),
                button("❓ Help", edit(event_id, EditAction::Help)),
            ],
        ],
    }
}
