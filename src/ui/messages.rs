use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::coordinator::wizard::WizardStep;
use crate::models::{Event, RsvpCounts};

fn local_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%a %d.%m.%Y %H:%M").to_string()
}

pub fn event_card(event: &Event, counts: Option<&RsvpCounts>, tz: Tz) -> String {
    let mut lines = vec![
        format!("📣 {}", event.title),
        format!("🗓️ {} · {} min", local_time(event.start_at, tz), event.duration_minutes),
    ];
    if let Some(presenter) = &event.presenter {
        lines.push(format!("🎤 {presenter}"));
    }
    if let Some(description) = &event.description {
        lines.push(format!("📝 {description}"));
    }
    if let Some(url) = &event.zoom_join_url {
        lines.push(format!("🔗 {url}"));
    }
    if let Some(counts) = counts {
        lines.push(format!(
            "👥 Going: {} | Maybe: {} | Total: {}",
            counts.going, counts.maybe, counts.total
        ));
    }
    lines.join("\n")
}

pub fn events_list(events: &[Event], tz: Tz) -> String {
    if events.is_empty() {
        return "📭 No upcoming events.".to_string();
    }
    let rows: Vec<String> = events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let presenter = event
                .presenter
                .as_deref()
                .map(|p| format!(" · {p}"))
                .unwrap_or_default();
            let link = event
                .zoom_join_url
                .as_deref()
                .map(|url| format!("\n   🔗 {url}"))
                .unwrap_or_default();
            format!(
                "{}. {} — {} · {} min{presenter}{link}",
                i + 1,
                event.title,
                local_time(event.start_at, tz),
                event.duration_minutes
            )
        })
        .collect();
    format!("📅 Upcoming events:\n{}", rows.join("\n"))
}

pub fn reminder_48h_text(event: &Event, counts: &RsvpCounts, tz: Tz) -> String {
    format!(
        "⏰ In 48h: {} ({})\n👥 Going: {} · Maybe: {}\n🔗 {}",
        event.title,
        local_time(event.start_at, tz),
        counts.going,
        counts.maybe,
        event.zoom_join_url.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string()
}

pub fn reminder_15m_text(event: &Event) -> String {
    format!(
        "🔔 In 15 minutes: {}\n{}",
        event.title,
        event.zoom_join_url.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string()
}

pub fn usage_text() -> String {
    [
        "Hi! I coordinate our talks.",
        "• /events: upcoming events",
        "• /next or /status: the next event with RSVPs",
        "• /edit key=value …: change the next event",
        "• /cancel: abort a running edit dialogue",
        "Or just write to me, e.g. \"new talk on Friday 19:00 by Alex about Rust\".",
    ]
    .join("\n")
}

pub fn edit_help_text() -> String {
    [
        "Editing help:",
        "• /edit start=2025-10-01T19:00",
        "• /edit title=New_title",
        "• /edit presenter=Alex",
        "• /edit duration=45",
        "• /edit recreate_zoom=true",
        "Underscores in values become spaces.",
    ]
    .join("\n")
}

pub fn wizard_prompt(step: WizardStep) -> String {
    let question = match step {
        WizardStep::Title => "New title?",
        WizardStep::Description => "New description?",
        WizardStep::StartAt => "New start? (YYYY-MM-DD HH:MM)",
        WizardStep::DurationMinutes => "New duration in minutes? (15-240)",
        WizardStep::Presenter => "New presenter?",
        WizardStep::ConferencingLink => "Conferencing link? Paste a URL or send \"new\" to generate one.",
        WizardStep::Confirm => return "Applying changes…".to_string(),
    };
    format!("{question}\nSend \"-\" to keep the current value.")
}

pub fn deleted_text() -> &'static str {
    "❌ This event was deleted."
}
