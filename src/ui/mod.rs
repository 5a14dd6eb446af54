//! Texts and inline keyboards shown in the chat.

mod keyboards;
mod messages;

pub use keyboards::{action_keyboard, edit_menu_keyboard, InlineButton, InlineKeyboard};
pub use messages::{
    deleted_text, edit_help_text, event_card, events_list, reminder_15m_text, reminder_48h_text,
    usage_text, wizard_prompt,
};
