#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use meetup_bot::coordinator::session::{MemorySessionStore, SessionStore};
use meetup_bot::coordinator::wizard::PendingEdit;
use meetup_bot::coordinator::{Caller, MutationCoordinator};
use meetup_bot::error::{AppError, AppResult};
use meetup_bot::models::{Event, NewEvent};
use meetup_bot::services::agent::{Agent, AgentContext, AgentReply};
use meetup_bot::services::events::EventService;
use meetup_bot::services::participants::RsvpLedger;
use meetup_bot::services::telegram::{ChatPlatform, MemberRole};
use meetup_bot::services::zoom::{ConferencingProvisioner, MeetingRequest, ProvisionedMeeting};
use meetup_bot::store::{EventStore, MemoryEventStore};
use meetup_bot::ui::InlineKeyboard;

pub const GROUP_CHAT: i64 = -100_123;
pub const ADMIN: i64 = 1;
pub const MEMBER: i64 = 2;

pub fn berlin() -> chrono_tz::Tz {
    chrono_tz::Europe::Berlin
}

/// Hands out a distinct link per call, or fails every call while `fail` is set.
#[derive(Default)]
pub struct StubProvisioner {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<MeetingRequest>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ConferencingProvisioner for StubProvisioner {
    async fn provision(&self, request: &MeetingRequest) -> AppResult<ProvisionedMeeting> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("zoom is down".to_string()));
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        Ok(ProvisionedMeeting {
            join_url: format!("https://zoom.example/j/{n}"),
            meeting_id: n.to_string(),
        })
    }
}

/// Records outbound traffic. Role lookups answer from `roles`; unknown users
/// make the lookup fail.
#[derive(Default)]
pub struct StubPlatform {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub answered: Mutex<Vec<(String, Option<String>, bool)>>,
    pub roles: Mutex<HashMap<i64, MemberRole>>,
    pub fail_sends: AtomicBool,
}

impl StubPlatform {
    pub fn with_roles(roles: &[(i64, MemberRole)]) -> Self {
        let platform = Self::default();
        platform.roles.lock().unwrap().extend(roles.iter().copied());
        platform
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl ChatPlatform for StubPlatform {
    async fn send_message(&self, chat_id: i64, text: &str, _keyboard: Option<&InlineKeyboard>) -> AppResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("telegram is down".to_string()));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        _message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> AppResult<()> {
        self.send_message(chat_id, text, keyboard).await
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) -> AppResult<()> {
        self.answered
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string), show_alert));
        Ok(())
    }

    async fn member_role(&self, _chat_id: i64, user_id: i64) -> AppResult<MemberRole> {
        self.roles
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .ok_or_else(|| AppError::UpstreamError("getChatMember failed".to_string()))
    }
}

/// Every call fails, as with Redis unreachable.
pub struct BrokenSessionStore;

#[async_trait]
impl SessionStore for BrokenSessionStore {
    async fn get(&self, _user_id: i64) -> AppResult<Option<PendingEdit>> {
        Err(AppError::UpstreamError("redis: connection refused".to_string()))
    }

    async fn set(&self, _user_id: i64, _edit: &PendingEdit) -> AppResult<()> {
        Err(AppError::UpstreamError("redis: connection refused".to_string()))
    }

    async fn delete(&self, _user_id: i64) -> AppResult<()> {
        Err(AppError::UpstreamError("redis: connection refused".to_string()))
    }
}

/// Always answers with the same reply.
pub struct ScriptedAgent(pub AgentReply);

#[async_trait]
impl Agent for ScriptedAgent {
    async fn decide(&self, _utterance: &str, _ctx: &AgentContext) -> AppResult<AgentReply> {
        Ok(self.0.clone())
    }
}

pub struct Fixture {
    pub store: Arc<MemoryEventStore>,
    pub provisioner: Arc<StubProvisioner>,
    pub platform: Arc<StubPlatform>,
    pub sessions: Arc<MemorySessionStore>,
    pub events: EventService,
    pub ledger: RsvpLedger,
    pub coordinator: MutationCoordinator,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(StubPlatform::with_roles(&[
            (ADMIN, MemberRole::Administrator),
            (MEMBER, MemberRole::Member),
        ]), None)
    }

    pub fn with_agent(reply: AgentReply) -> Self {
        Self::build(StubPlatform::with_roles(&[
            (ADMIN, MemberRole::Administrator),
            (MEMBER, MemberRole::Member),
        ]), Some(Arc::new(ScriptedAgent(reply))))
    }

    /// Same wiring, but wizard sessions live in `sessions`.
    pub fn with_sessions(sessions: Arc<dyn SessionStore>) -> Self {
        let mut fx = Self::new();
        fx.coordinator = MutationCoordinator::new(
            fx.events.clone(),
            fx.ledger.clone(),
            fx.platform.clone(),
            None,
            sessions,
            Some(GROUP_CHAT),
        );
        fx
    }

    pub fn build(platform: StubPlatform, agent: Option<Arc<dyn Agent>>) -> Self {
        let store = Arc::new(MemoryEventStore::new());
        let provisioner = Arc::new(StubProvisioner::default());
        let platform = Arc::new(platform);
        let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(1800)));

        let dyn_store: Arc<dyn EventStore> = store.clone();
        let events = EventService::new(dyn_store.clone(), Some(provisioner.clone()), berlin());
        let ledger = RsvpLedger::new(dyn_store);
        let coordinator = MutationCoordinator::new(
            events.clone(),
            ledger.clone(),
            platform.clone(),
            agent,
            sessions.clone() as Arc<dyn SessionStore>,
            Some(GROUP_CHAT),
        );

        Self {
            store,
            provisioner,
            platform,
            sessions,
            events,
            ledger,
            coordinator,
        }
    }

    pub async fn seed(&self, title: &str, start_at: DateTime<Utc>) -> Event {
        self.store
            .insert_event(NewEvent {
                title: title.to_string(),
                presenter: None,
                description: None,
                start_at,
                duration_minutes: 60,
                conferencing: None,
                created_by: Some(ADMIN),
            })
            .await
            .unwrap()
    }
}

pub fn in_group(user_id: i64) -> Caller {
    Caller {
        chat_id: GROUP_CHAT,
        user_id,
        display_name: Some(format!("user{user_id}")),
    }
}

pub fn in_private(user_id: i64) -> Caller {
    Caller {
        chat_id: user_id,
        user_id,
        display_name: Some(format!("user{user_id}")),
    }
}
