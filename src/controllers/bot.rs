//! Routes Telegram updates to the coordinator and renders the outcome.
//!
//! Every handler ends here with either a reply or a logged error turned into
//! a short user-facing message; nothing is propagated back to the webhook.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, error, info};

use crate::controllers::telegram::{CallbackQuery, Message, Update};
use crate::coordinator::callback::CallbackAction;
use crate::coordinator::{AgentOutcome, Caller, CallbackOutcome, WizardOutcome};
use crate::error::AppResult;
use crate::models::{Event, RsvpCounts};
use crate::ui::{self, InlineKeyboard};
use crate::AppState;

const NO_UPCOMING: &str = "📭 No upcoming event.";

fn list_shortcut_regex() -> &'static Regex {
    static LIST_RE: OnceLock<Regex> = OnceLock::new();
    LIST_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:list|show)(?:\s+me)?(?:\s+(?:all|the))?(?:\s+(?:upcoming|next|coming))?\s+(?:events|talks|meetups)\s*[.!?]*\s*$")
            .expect("list shortcut regex must compile")
    })
}

fn event_keywords_regex() -> &'static Regex {
    static KEYWORDS_RE: OnceLock<Regex> = OnceLock::new();
    KEYWORDS_RE.get_or_init(|| {
        Regex::new(r"(?i)new talk|talk|presentation|event|meeting|reschedul|postpone|edit|change|update|neuer talk|vortrag|neue präsentation|verschieb|änder")
            .expect("event keyword regex must compile")
    })
}

pub fn is_list_shortcut(text: &str) -> bool {
    list_shortcut_regex().is_match(text)
}

/// Whether a plain message is meant for the assistant.
pub fn addresses_agent(text: &str, private_chat: bool, bot_username: Option<&str>) -> bool {
    if private_chat {
        return true;
    }
    let mentioned = bot_username
        .map(|name| text.to_lowercase().contains(&format!("@{}", name.to_lowercase())))
        .unwrap_or(false);
    mentioned || event_keywords_regex().is_match(text)
}

#[derive(Debug, PartialEq, Eq)]
pub struct Command<'a> {
    pub name: String,
    pub args: &'a str,
    /// False for `/cmd@other_bot` in group chats.
    pub for_us: bool,
}

pub fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> Option<Command<'a>> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let (name, for_us) = match head.split_once('@') {
        Some((name, target)) => (
            name,
            bot_username
                .map(|me| me.eq_ignore_ascii_case(target))
                .unwrap_or(true),
        ),
        None => (head, true),
    };
    if name.is_empty() {
        return None;
    }
    Some(Command {
        name: name.to_lowercase(),
        args,
        for_us,
    })
}

pub async fn dispatch(state: &AppState, update: Update) {
    if let Some(query) = update.callback_query {
        handle_callback(state, query).await;
    } else if let Some(message) = update.message {
        handle_message(state, message).await;
    }
}

async fn send(state: &AppState, chat_id: i64, text: &str, keyboard: Option<&InlineKeyboard>) {
    if let Err(e) = state.platform.send_message(chat_id, text, keyboard).await {
        error!(chat_id, error = %e, "Failed to send reply");
    }
}

fn card(event: &Event, counts: Option<&RsvpCounts>, state: &AppState) -> (String, InlineKeyboard) {
    (
        ui::event_card(event, counts, state.coordinator.timezone()),
        ui::action_keyboard(event.id),
    )
}

async fn handle_message(state: &AppState, message: Message) {
    let Some(text) = message.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    let Some(from) = &message.from else {
        return;
    };
    let caller = Caller {
        chat_id: message.chat.id,
        user_id: from.id,
        display_name: from.display_name(),
    };

    let result = match parse_command(text, state.bot_username.as_deref()) {
        Some(command) if !command.for_us => return,
        Some(command) => run_command(state, &caller, &command).await,
        None => route_text(state, &caller, message.chat.is_private(), text).await,
    };

    if let Err(e) = result {
        e.log("message");
        send(state, caller.chat_id, &e.user_message(), None).await;
    }
}

async fn run_command(state: &AppState, caller: &Caller, command: &Command<'_>) -> AppResult<()> {
    let coordinator = &state.coordinator;
    match command.name.as_str() {
        "start" | "help" => send(state, caller.chat_id, &ui::usage_text(), None).await,
        "id" => send(state, caller.chat_id, &format!("chat id: {}", caller.chat_id), None).await,
        "events" => {
            let events = coordinator.list_upcoming(None).await?;
            send(state, caller.chat_id, &ui::events_list(&events, coordinator.timezone()), None).await;
        }
        "next" | "status" => match coordinator.status_next().await? {
            Some((event, counts)) => {
                let (text, keyboard) = card(&event, Some(&counts), state);
                send(state, caller.chat_id, &text, Some(&keyboard)).await;
            }
            None => send(state, caller.chat_id, NO_UPCOMING, None).await,
        },
        "edit" if command.args.is_empty() => {
            send(state, caller.chat_id, &ui::edit_help_text(), None).await;
        }
        "edit" => {
            let event = coordinator.edit_command(caller, command.args).await?;
            let (text, keyboard) = card(&event, None, state);
            send(state, caller.chat_id, &format!("Updated ✅\n{text}"), Some(&keyboard)).await;
        }
        "cancel" => {
            let reply = if coordinator.cancel_wizard(caller.user_id).await? {
                "Edit cancelled."
            } else {
                "Nothing to cancel."
            };
            send(state, caller.chat_id, reply, None).await;
        }
        other => debug!(command = other, "Ignoring unknown command"),
    }
    Ok(())
}

async fn route_text(state: &AppState, caller: &Caller, private_chat: bool, text: &str) -> AppResult<()> {
    let coordinator = &state.coordinator;

    if let Some(outcome) = coordinator.continue_wizard(caller, text).await? {
        match outcome {
            WizardOutcome::Prompt(step) => send(state, caller.chat_id, &ui::wizard_prompt(step), None).await,
            WizardOutcome::Rejected { reason, step } => {
                let reply = format!("{reason}\n{}", ui::wizard_prompt(step));
                send(state, caller.chat_id, &reply, None).await;
            }
            WizardOutcome::Applied(event) => {
                let (text, keyboard) = card(&event, None, state);
                send(state, caller.chat_id, &format!("Updated ✅\n{text}"), Some(&keyboard)).await;
            }
        }
        return Ok(());
    }

    if is_list_shortcut(text) {
        let events = coordinator.list_upcoming(None).await?;
        send(state, caller.chat_id, &ui::events_list(&events, coordinator.timezone()), None).await;
        return Ok(());
    }

    if !addresses_agent(text, private_chat, state.bot_username.as_deref()) {
        return Ok(());
    }

    match coordinator.converse(caller, text).await? {
        AgentOutcome::Created(event, counts) => {
            let (text, keyboard) = card(&event, Some(&counts), state);
            send(state, caller.chat_id, &text, Some(&keyboard)).await;
        }
        AgentOutcome::Updated(event) => {
            let (text, keyboard) = card(&event, None, state);
            send(state, caller.chat_id, &format!("Updated ✅\n{text}"), Some(&keyboard)).await;
        }
        AgentOutcome::RsvpSaved(participant) => {
            send(state, caller.chat_id, &format!("Saved ✅ ({})", participant.status), None).await;
        }
        AgentOutcome::Status(Some((event, counts))) => {
            let (text, keyboard) = card(&event, Some(&counts), state);
            send(state, caller.chat_id, &text, Some(&keyboard)).await;
        }
        AgentOutcome::Status(None) => send(state, caller.chat_id, NO_UPCOMING, None).await,
        AgentOutcome::Listed(events) => {
            send(state, caller.chat_id, &ui::events_list(&events, coordinator.timezone()), None).await;
        }
        AgentOutcome::Announcement(text) | AgentOutcome::Text(text) => {
            send(state, caller.chat_id, &text, None).await;
        }
    }
    Ok(())
}

async fn answer(state: &AppState, query: &CallbackQuery, text: Option<&str>, alert: bool) {
    if let Err(e) = state.platform.answer_callback(&query.id, text, alert).await {
        error!(callback_id = %query.id, error = %e, "Failed to answer callback");
    }
}

/// Replaces the message the button belonged to, or posts a new one when that
/// is not possible.
async fn replace_or_send(state: &AppState, query: &CallbackQuery, chat_id: i64, text: &str, keyboard: Option<&InlineKeyboard>) {
    if let Some(message) = &query.message {
        match state
            .platform
            .edit_message_text(message.chat.id, message.message_id, text, keyboard)
            .await
        {
            Ok(()) => return,
            Err(e) => debug!(error = %e, "Editing the message failed, sending a new one"),
        }
    }
    send(state, chat_id, text, keyboard).await;
}

async fn handle_callback(state: &AppState, query: CallbackQuery) {
    let Some(action) = query.data.as_deref().and_then(CallbackAction::parse) else {
        answer(state, &query, None, false).await;
        return;
    };
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or(query.from.id);
    let caller = Caller {
        chat_id,
        user_id: query.from.id,
        display_name: query.from.display_name(),
    };

    let outcome = match state.coordinator.handle_callback(&caller, action).await {
        Ok(outcome) => outcome,
        Err(e) => {
            e.log("callback");
            answer(state, &query, Some(&e.user_message()), true).await;
            return;
        }
    };

    let tz = state.coordinator.timezone();
    match outcome {
        CallbackOutcome::RsvpSaved(event, counts) => {
            answer(state, &query, Some("Saved ✅"), false).await;
            if let Some(message) = &query.message {
                let text = ui::event_card(&event, Some(&counts), tz);
                if let Err(e) = state
                    .platform
                    .edit_message_text(message.chat.id, message.message_id, &text, Some(&ui::action_keyboard(event.id)))
                    .await
                {
                    // "message is not modified" when the counts did not change
                    debug!(error = %e, "Card refresh skipped");
                }
            }
        }
        CallbackOutcome::EditMenu(event_id) => {
            answer(state, &query, None, false).await;
            send(state, chat_id, "What would you like to change?", Some(&ui::edit_menu_keyboard(event_id))).await;
        }
        CallbackOutcome::Help => {
            answer(state, &query, None, false).await;
            send(state, chat_id, &ui::edit_help_text(), None).await;
        }
        CallbackOutcome::Updated(event, counts) => {
            answer(state, &query, Some("Updated ✅"), false).await;
            let text = ui::event_card(&event, Some(&counts), tz);
            replace_or_send(state, &query, chat_id, &text, Some(&ui::action_keyboard(event.id))).await;
        }
        CallbackOutcome::WizardStarted(step) => {
            answer(state, &query, None, false).await;
            send(state, chat_id, &ui::wizard_prompt(step), None).await;
        }
        CallbackOutcome::Deleted(event) => {
            info!(event_id = %event.id, user_id = caller.user_id, "Event deleted via button");
            answer(state, &query, Some("Event deleted ✅"), false).await;
            replace_or_send(state, &query, chat_id, ui::deleted_text(), None).await;
        }
    }
}
