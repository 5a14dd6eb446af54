mod common;

use chrono::{Datelike, Duration, TimeZone, Utc};
use std::sync::atomic::Ordering;

use common::Fixture;
use meetup_bot::error::AppError;
use meetup_bot::models::{EventPatch, RsvpStatus, StartAt};
use meetup_bot::services::events::CreateEvent;
use meetup_bot::store::EventStore;

fn talk() -> CreateEvent {
    CreateEvent {
        title: "Talk".to_string(),
        start_at: "2099-01-01T10:00:00Z".to_string(),
        duration_minutes: 30,
        presenter: Some("Alex".to_string()),
        description: None,
        provision_conferencing: true,
        created_by: Some(common::ADMIN),
    }
}

#[tokio::test]
async fn create_stores_fields_and_provisions_a_meeting() {
    let fx = Fixture::new();

    let event = fx.events.create(talk()).await.unwrap();

    assert_eq!(event.title, "Talk");
    assert_eq!(event.start_at, Utc.with_ymd_and_hms(2099, 1, 1, 10, 0, 0).unwrap());
    assert_eq!(event.duration_minutes, 30);
    assert_eq!(event.presenter.as_deref(), Some("Alex"));
    assert!(!event.reminder_48h_posted);
    assert!(!event.reminder_15m_posted);
    assert_eq!(fx.provisioner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(event.zoom_join_url.as_deref(), Some("https://zoom.example/j/1"));
    assert_eq!(event.zoom_meeting_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn create_without_conferencing_skips_the_provisioner() {
    let fx = Fixture::new();

    let event = fx
        .events
        .create(CreateEvent {
            provision_conferencing: false,
            ..talk()
        })
        .await
        .unwrap();

    assert_eq!(fx.provisioner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(event.zoom_join_url, None);
}

#[tokio::test]
async fn create_rejects_unreadable_dates() {
    let fx = Fixture::new();

    let err = fx
        .events
        .create(CreateEvent {
            start_at: "sometime next week".to_string(),
            ..talk()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(fx.store.list_upcoming(Utc::now(), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn recreate_replaces_the_link() {
    let fx = Fixture::new();
    let created = fx.events.create(talk()).await.unwrap();

    let updated = fx
        .events
        .apply_patch(None, EventPatch::recreate_conferencing())
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    let new_url = updated.zoom_join_url.clone().unwrap();
    assert_ne!(Some(new_url), created.zoom_join_url);
    assert_eq!(updated.zoom_meeting_id.as_deref(), Some("2"));
}

#[tokio::test]
async fn recreate_uses_patched_values_for_the_meeting() {
    let fx = Fixture::new();
    let created = fx.events.create(talk()).await.unwrap();

    fx.events
        .apply_patch(
            Some(created.id),
            EventPatch {
                title: Some("Renamed".to_string()),
                duration_minutes: Some(90),
                recreate_conferencing: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let requests = fx.provisioner.requests.lock().unwrap();
    let last = requests.last().unwrap();
    assert_eq!(last.title, "Renamed");
    assert_eq!(last.duration_minutes, 90);
    assert_eq!(last.start_at, created.start_at);
}

#[tokio::test]
async fn failed_provisioning_aborts_create() {
    let fx = Fixture::new();
    fx.provisioner.fail.store(true, Ordering::SeqCst);

    let err = fx.events.create(talk()).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamError(_)));
    assert!(fx.store.list_upcoming(Utc::now(), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_recreate_leaves_the_event_untouched() {
    let fx = Fixture::new();
    let created = fx.events.create(talk()).await.unwrap();
    fx.provisioner.fail.store(true, Ordering::SeqCst);

    let err = fx
        .events
        .apply_patch(
            Some(created.id),
            EventPatch {
                title: Some("Renamed".to_string()),
                recreate_conferencing: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UpstreamError(_)));
    let stored = fx.store.get_event(created.id).await.unwrap();
    assert_eq!(stored.title, "Talk");
    assert_eq!(stored.zoom_join_url, created.zoom_join_url);
    assert_eq!(stored.zoom_meeting_id, created.zoom_meeting_id);
}

#[tokio::test]
async fn patch_without_id_targets_the_next_event() {
    let fx = Fixture::new();
    let now = Utc::now();
    let later = fx.seed("Later", now + Duration::days(10)).await;
    let sooner = fx.seed("Sooner", now + Duration::days(2)).await;

    let updated = fx
        .events
        .apply_patch(
            None,
            EventPatch {
                presenter: Some("Sam".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, sooner.id);
    assert_eq!(updated.presenter.as_deref(), Some("Sam"));
    assert_eq!(fx.events.get(later.id).await.unwrap().presenter, None);
}

#[tokio::test]
async fn patch_without_upcoming_event_is_not_found() {
    let fx = Fixture::new();
    fx.seed("Past", Utc::now() - Duration::days(1)).await;

    let err = fx
        .events
        .apply_patch(None, EventPatch::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn patch_leaves_absent_fields_alone_and_repairs_the_year() {
    let fx = Fixture::new();
    let event = fx.events.create(talk()).await.unwrap();
    let now = Utc::now();
    let stale = format!("{}-12-24T18:00:00Z", now.year() - 1);

    let updated = fx
        .events
        .apply_patch(Some(event.id), EventPatch::start_at(StartAt::Raw(stale)))
        .await
        .unwrap();

    assert!(updated.start_at > now - Duration::hours(24));
    assert_eq!(updated.title, "Talk");
    assert_eq!(updated.zoom_join_url, event.zoom_join_url);
}

#[tokio::test]
async fn unknown_event_id_is_not_found() {
    let fx = Fixture::new();
    let err = fx
        .events
        .apply_patch(Some(uuid::Uuid::new_v4()), EventPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = fx.events.delete(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_participants_first() {
    let fx = Fixture::new();
    let event = fx.seed("Doomed", Utc::now() + Duration::days(3)).await;
    fx.ledger
        .set_participant(event.id, 10, Some("Kim".into()), RsvpStatus::Going)
        .await
        .unwrap();
    fx.ledger
        .set_participant(event.id, 11, None, RsvpStatus::Maybe)
        .await
        .unwrap();

    let deleted = fx.events.delete(event.id).await.unwrap();

    assert_eq!(deleted.id, event.id);
    assert_eq!(fx.store.participant_rows().await, 0);
    assert!(matches!(fx.events.get(event.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn rsvp_is_an_upsert_per_user() {
    let fx = Fixture::new();
    let event = fx.seed("Meetup", Utc::now() + Duration::days(3)).await;

    fx.ledger
        .set_participant(event.id, 10, Some("Kim".into()), RsvpStatus::Going)
        .await
        .unwrap();
    let row = fx
        .ledger
        .set_participant(event.id, 10, Some("Kim".into()), RsvpStatus::Maybe)
        .await
        .unwrap();

    assert_eq!(row.status, RsvpStatus::Maybe);
    let counts = fx.ledger.counts_for(event.id).await.unwrap();
    assert_eq!((counts.going, counts.maybe, counts.total), (0, 1, 1));
}

#[tokio::test]
async fn declined_counts_only_towards_total() {
    let fx = Fixture::new();
    let event = fx.seed("Meetup", Utc::now() + Duration::days(3)).await;

    fx.ledger
        .set_participant(event.id, 10, None, RsvpStatus::Declined)
        .await
        .unwrap();

    let counts = fx.ledger.counts_for(event.id).await.unwrap();
    assert_eq!((counts.going, counts.maybe, counts.total), (0, 0, 1));
}

#[tokio::test]
async fn rsvp_for_unknown_event_is_not_found() {
    let fx = Fixture::new();
    let err = fx
        .ledger
        .set_participant(uuid::Uuid::new_v4(), 10, None, RsvpStatus::Going)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
