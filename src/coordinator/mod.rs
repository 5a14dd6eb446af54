//! Mutation coordinator: every surface that can change an event (agent tool
//! calls, `/edit`, the wizard, inline buttons) funnels through here, so the
//! admin gate and the single `apply_patch` path are enforced in one place.
//!
//! Admin gating only applies to requests that originate in the community
//! chat. A failed role lookup denies.

pub mod callback;
pub mod command;
pub mod session;
pub mod wizard;

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Event, EventPatch, Participant, RsvpCounts, StartAt};
use crate::services::agent::{Agent, AgentContext, AgentReply, ToolCall};
use crate::services::events::{CreateEvent, EventService};
use crate::services::participants::RsvpLedger;
use crate::services::telegram::ChatPlatform;
use crate::services::time::tomorrow_at;

use callback::{CallbackAction, EditAction};
use session::SessionStore;
use wizard::{PendingEdit, WizardMode, WizardStep};

const DEFAULT_LIST_LIMIT: i64 = 5;
const MAX_LIST_LIMIT: i64 = 10;

/// Who is asking, and from where.
#[derive(Debug, Clone)]
pub struct Caller {
    pub chat_id: i64,
    pub user_id: i64,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    Created(Event, RsvpCounts),
    Updated(Event),
    RsvpSaved(Participant),
    Status(Option<(Event, RsvpCounts)>),
    Listed(Vec<Event>),
    Announcement(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    RsvpSaved(Event, RsvpCounts),
    EditMenu(Uuid),
    Help,
    Updated(Event, RsvpCounts),
    WizardStarted(WizardStep),
    Deleted(Event),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    /// Answer taken, ask the next question.
    Prompt(WizardStep),
    /// Answer refused, the same question is asked again.
    Rejected { reason: String, step: WizardStep },
    Applied(Event),
}

#[derive(Clone)]
pub struct MutationCoordinator {
    events: EventService,
    ledger: RsvpLedger,
    platform: Arc<dyn ChatPlatform>,
    agent: Option<Arc<dyn Agent>>,
    sessions: Arc<dyn SessionStore>,
    group_chat_id: Option<i64>,
}

impl MutationCoordinator {
    pub fn new(
        events: EventService,
        ledger: RsvpLedger,
        platform: Arc<dyn ChatPlatform>,
        agent: Option<Arc<dyn Agent>>,
        sessions: Arc<dyn SessionStore>,
        group_chat_id: Option<i64>,
    ) -> Self {
        Self {
            events,
            ledger,
            platform,
            agent,
            sessions,
            group_chat_id,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.events.timezone()
    }

    pub async fn authorize(&self, chat_id: i64, user_id: i64) -> AppResult<()> {
        let Some(group_chat_id) = self.group_chat_id.filter(|group| *group == chat_id) else {
            return Ok(());
        };
        match self.platform.member_role(group_chat_id, user_id).await {
            Ok(role) if role.is_elevated() => Ok(()),
            Ok(role) => {
                info!(user_id, ?role, "Mutation denied for non-admin");
                Err(AppError::AuthorizationError(format!("user {user_id} is not an admin")))
            }
            Err(e) => {
                warn!(user_id, error = %e, "Role lookup failed, denying mutation");
                Err(AppError::AuthorizationError(format!("role lookup failed: {e}")))
            }
        }
    }

    /// Card data for the next event, if any.
    pub async fn status_next(&self) -> AppResult<Option<(Event, RsvpCounts)>> {
        match self.events.next_event().await? {
            Some(event) => {
                let counts = self.ledger.counts_for(event.id).await?;
                Ok(Some((event, counts)))
            }
            None => Ok(None),
        }
    }

    pub async fn list_upcoming(&self, limit: Option<i64>) -> AppResult<Vec<Event>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        self.events.list_upcoming(limit).await
    }

    /// `/edit key=value …` against the next upcoming event.
    pub async fn edit_command(&self, caller: &Caller, args: &str) -> AppResult<Event> {
        self.authorize(caller.chat_id, caller.user_id).await?;
        let patch = command::parse_edit_args(args)?;
        self.events.apply_patch(None, patch).await
    }

    pub async fn handle_callback(&self, caller: &Caller, action: CallbackAction) -> AppResult<CallbackOutcome> {
        if action.is_mutation() {
            self.authorize(caller.chat_id, caller.user_id).await?;
        }
        match action {
            CallbackAction::Rsvp { event_id, status } => {
                self.ledger
                    .set_participant(event_id, caller.user_id, caller.display_name.clone(), status)
                    .await?;
                let event = self.events.get(event_id).await?;
                let counts = self.ledger.counts_for(event_id).await?;
                Ok(CallbackOutcome::RsvpSaved(event, counts))
            }
            CallbackAction::Edit { event_id, action: None } => Ok(CallbackOutcome::EditMenu(event_id)),
            CallbackAction::Edit { action: Some(EditAction::Help), .. } => Ok(CallbackOutcome::Help),
            CallbackAction::Edit { event_id, action: Some(action) } => {
                let patch = self.shortcut_patch(event_id, action).await?;
                let event = self.events.apply_patch(Some(event_id), patch).await?;
                let counts = self.ledger.counts_for(event.id).await?;
                Ok(CallbackOutcome::Updated(event, counts))
            }
            CallbackAction::EditAll { event_id } => self
                .open_wizard(caller.user_id, event_id, WizardMode::Full)
                .await
                .map(CallbackOutcome::WizardStarted),
            CallbackAction::EditTitle { event_id } => self
                .open_wizard(caller.user_id, event_id, WizardMode::TitleOnly)
                .await
                .map(CallbackOutcome::WizardStarted),
            CallbackAction::Delete { event_id } => {
                let event = self.events.delete(event_id).await?;
                Ok(CallbackOutcome::Deleted(event))
            }
        }
    }

    async fn shortcut_patch(&self, event_id: Uuid, action: EditAction) -> AppResult<EventPatch> {
        match action {
            EditAction::Shift(minutes) => {
                let current = self.events.get(event_id).await?;
                let moved = current.start_at + Duration::minutes(minutes);
                Ok(EventPatch::start_at(StartAt::Exact(moved)))
            }
            EditAction::Tomorrow { hour, minute } => {
                let instant = tomorrow_at(Utc::now(), self.timezone(), hour, minute)?;
                Ok(EventPatch::start_at(StartAt::Exact(instant)))
            }
            EditAction::RegenerateLink => Ok(EventPatch::recreate_conferencing()),
            EditAction::Help => Ok(EventPatch::default()),
        }
    }

    /// Starts (or restarts) the guided dialogue for `user_id`. Admin checks
    /// happen before this, in the callback handling.
    async fn open_wizard(&self, user_id: i64, event_id: Uuid, mode: WizardMode) -> AppResult<WizardStep> {
        self.events.get(event_id).await?;
        let edit = PendingEdit::new(event_id, mode);
        self.sessions.set(user_id, &edit).await?;
        info!(user_id, event_id = %event_id, ?mode, "Wizard started");
        Ok(edit.step)
    }

    /// Feeds a text message to the user's running wizard. `None` when no
    /// wizard is active for them, or when the session store cannot tell.
    pub async fn continue_wizard(&self, caller: &Caller, text: &str) -> AppResult<Option<WizardOutcome>> {
        let mut edit = match self.sessions.get(caller.user_id).await {
            Ok(Some(edit)) => edit,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(user_id = caller.user_id, error = %e, "Wizard session lookup failed, routing normally");
                return Ok(None);
            }
        };

        match edit.accept(text, Utc::now(), self.timezone()) {
            Ok(()) => {}
            Err(e @ (AppError::ValidationError(_) | AppError::StateError(_))) => {
                self.sessions.set(caller.user_id, &edit).await?;
                return Ok(Some(WizardOutcome::Rejected {
                    reason: e.user_message(),
                    step: edit.step,
                }));
            }
            Err(e) => {
                self.sessions.delete(caller.user_id).await?;
                return Err(e);
            }
        }

        if !edit.is_complete() {
            self.sessions.set(caller.user_id, &edit).await?;
            return Ok(Some(WizardOutcome::Prompt(edit.step)));
        }

        // The session is gone whether or not the patch applies.
        self.sessions.delete(caller.user_id).await?;
        let event = self.events.apply_patch(Some(edit.event_id), edit.patch).await?;
        info!(user_id = caller.user_id, event_id = %event.id, "Wizard applied");
        Ok(Some(WizardOutcome::Applied(event)))
    }

    /// Returns whether a wizard was running.
    pub async fn cancel_wizard(&self, user_id: i64) -> AppResult<bool> {
        let existed = self.sessions.get(user_id).await?.is_some();
        self.sessions.delete(user_id).await?;
        Ok(existed)
    }

    /// Free-form surface: let the agent pick an intent, then run it.
    pub async fn converse(&self, caller: &Caller, utterance: &str) -> AppResult<AgentOutcome> {
        let Some(agent) = &self.agent else {
            return Ok(AgentOutcome::Text(
                "🤖 The assistant is not available right now. Try /events, /next or /edit.".to_string(),
            ));
        };
        let ctx = AgentContext {
            user_id: caller.user_id,
            display_name: caller.display_name.clone(),
            now: Utc::now(),
            timezone: self.timezone(),
        };
        match agent.decide(utterance, &ctx).await? {
            AgentReply::Text(text) => Ok(AgentOutcome::Text(text)),
            AgentReply::Tool(call) => self.execute_tool(caller, call).await,
        }
    }

    pub async fn execute_tool(&self, caller: &Caller, call: ToolCall) -> AppResult<AgentOutcome> {
        match call {
            ToolCall::EventsCreate(args) => {
                let event = self
                    .events
                    .create(CreateEvent {
                        title: args.title,
                        start_at: args.start_at,
                        duration_minutes: args.duration_minutes,
                        presenter: args.presenter,
                        description: args.description,
                        provision_conferencing: args.create_zoom.unwrap_or(true),
                        created_by: Some(caller.user_id),
                    })
                    .await?;
                let counts = self.ledger.counts_for(event.id).await?;
                Ok(AgentOutcome::Created(event, counts))
            }
            ToolCall::EventsUpdate(args) => {
                self.authorize(caller.chat_id, caller.user_id).await?;
                let target = args.target()?;
                let event = self.events.apply_patch(target, args.patch.into()).await?;
                Ok(AgentOutcome::Updated(event))
            }
            ToolCall::ParticipantsSet(args) => {
                let event_id = Uuid::parse_str(args.event_id.trim())
                    .map_err(|_| AppError::NotFound(format!("no event with id '{}'", args.event_id)))?;
                let participant = self
                    .ledger
                    .set_participant(event_id, caller.user_id, caller.display_name.clone(), args.status)
                    .await?;
                Ok(AgentOutcome::RsvpSaved(participant))
            }
            ToolCall::EventsStatusNext => self.status_next().await.map(AgentOutcome::Status),
            ToolCall::EventsList { limit } => self.list_upcoming(limit).await.map(AgentOutcome::Listed),
            ToolCall::AnnounceToGroup { text } => Ok(AgentOutcome::Announcement(text)),
            ToolCall::Unknown(name) => {
                warn!(tool = %name, "Agent requested an unknown tool");
                Ok(AgentOutcome::Text("🤔 I can't do that yet.".to_string()))
            }
        }
    }
}
