use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    config::Config,
    db,
    models::announcement::{Announcement, NewAnnouncement},
    services::{
        announcements::AnnouncementService, clock::manual::ManualClock, lifecycle,
        transport::recording::RecordingTransport,
    },
    AppState,
};

pub const PUBLIC: &str = "public";
pub const ADMIN: &str = "admin";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        transport_base_url: "http://transport.invalid".into(),
        transport_token: None,
        public_channel_id: PUBLIC.into(),
        admin_channel_id: ADMIN.into(),
        cohorts: vec!["GT".into(), "Emory".into(), "GSU".into()],
        scheduler_interval_ms: 1000,
        external_timeout_ms: 5000,
        retention_days: 180,
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub struct Harness {
    pub state: AppState,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<ManualClock>,
}

pub async fn harness() -> Harness {
    let transport = Arc::new(RecordingTransport::new());
    let clock = Arc::new(ManualClock::at(t0()));
    let state = AppState {
        db: db::memory_pool().await,
        config: Arc::new(test_config()),
        transport: transport.clone(),
        clock: clock.clone(),
    };
    Harness {
        state,
        transport,
        clock,
    }
}

pub fn new_announcement(
    send_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    reactable: bool,
) -> NewAnnouncement {
    NewAnnouncement {
        title: "Sunday service".into(),
        content: "Rides leave from the student center.".into(),
        send_at,
        end_at,
        reactable,
    }
}

/// Create an announcement due now, open for an hour, and publish it.
pub async fn publish_now(h: &Harness, reactable: bool) -> Announcement {
    let now = h.state.now();
    let a = AnnouncementService::create(
        &h.state,
        new_announcement(now, now + Duration::hours(1), reactable),
    )
    .await
    .unwrap();
    assert!(lifecycle::publish(&h.state, &a).await.unwrap());
    AnnouncementService::get(&h.state.db, a.id).await.unwrap()
}
