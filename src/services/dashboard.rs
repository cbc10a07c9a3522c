use futures_util::future::join_all;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{announcement::Announcement, registration::RegistrationEntry},
    services::{
        aggregation::{aggregate, Aggregation, DashboardPage, ResolvedEntry},
        announcements::AnnouncementService,
        registrations::RegistrationService,
        render,
        transport::{TransportError, View},
    },
    AppState,
};

/// A dashboard's page sequence and its cursor. The cursor is always a valid index.
#[derive(Debug, Clone)]
pub struct DashboardPages {
    pages: Vec<DashboardPage>,
    cursor: usize,
}

/// The page under the cursor, with its position.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub index: usize,
    pub total: usize,
    pub page: &'a DashboardPage,
}

impl PageView<'_> {
    pub fn position(&self) -> String {
        format!("Page {}/{}", self.index + 1, self.total)
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }
}

impl DashboardPages {
    /// A persisted cursor past the end clamps to the last page.
    pub fn new(mut pages: Vec<DashboardPage>, cursor: i64) -> Self {
        if pages.is_empty() {
            pages.push(DashboardPage::Summary {
                cohorts: Vec::new(),
            });
        }
        let last = pages.len() - 1;
        let cursor = usize::try_from(cursor.max(0)).unwrap_or(usize::MAX).min(last);
        Self { pages, cursor }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns whether the cursor moved.
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.pages.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Returns whether the cursor moved.
    pub fn retreat(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Swap in a recomputed sequence, keeping the cursor where it still fits.
    pub fn replace(&mut self, pages: Vec<DashboardPage>) {
        *self = Self::new(pages, self.cursor as i64);
    }

    pub fn current(&self) -> PageView<'_> {
        PageView {
            index: self.cursor,
            total: self.pages.len(),
            page: &self.pages[self.cursor],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

pub struct DashboardService;

impl DashboardService {
    /// Attach display names. Participants the directory no longer knows are left out.
    /// Lookups run concurrently, so a hung directory costs one timeout per refresh.
    pub async fn resolve(state: &AppState, entries: &[RegistrationEntry]) -> Vec<ResolvedEntry> {
        let outbound = state.outbound();
        let lookups = join_all(
            entries
                .iter()
                .map(|entry| outbound.resolve_identity(&entry.participant_id)),
        )
        .await;

        entries
            .iter()
            .zip(lookups)
            .filter_map(|(entry, lookup)| match lookup {
                Ok(identity) => Some(ResolvedEntry {
                    display_name: identity.display_name,
                    cohort: entry.cohort.clone(),
                    role: entry.role,
                    capacity: entry.capacity,
                }),
                Err(TransportError::NotFound) => {
                    debug!("Dashboard: skipping unknown participant {}", entry.participant_id);
                    None
                }
                Err(e) => {
                    warn!(
                        "Dashboard: could not resolve participant {}: {}",
                        entry.participant_id, e
                    );
                    None
                }
            })
            .collect()
    }

    pub async fn aggregate_for(state: &AppState, id: Uuid) -> Result<Aggregation, AppError> {
        let entries = RegistrationService::list(&state.db, id).await?;
        let resolved = Self::resolve(state, &entries).await;
        Ok(aggregate(&state.config.cohorts, &resolved))
    }

    /// Recompute the page sequence, positioned at the persisted cursor.
    pub async fn pages_for(state: &AppState, a: &Announcement) -> Result<DashboardPages, AppError> {
        let aggregation = Self::aggregate_for(state, a.id).await?;
        Ok(DashboardPages::new(aggregation.pages(), a.dashboard_page))
    }

    /// Post a fresh dashboard on its first page and return its reference.
    pub async fn publish(state: &AppState, a: &Announcement) -> Result<String, AppError> {
        let aggregation = Self::aggregate_for(state, a.id).await?;
        let pages = DashboardPages::new(aggregation.pages(), 0);
        let view = render::dashboard_view(a, &pages.current(), state.now());
        let dashboard_ref = state
            .outbound()
            .publish(&state.config.admin_channel_id, &view)
            .await?;
        Ok(dashboard_ref)
    }

    /// Re-render an existing dashboard. Returns `false` when there is nothing to refresh,
    /// including when the dashboard was removed on the platform side.
    pub async fn refresh(state: &AppState, id: Uuid) -> Result<bool, AppError> {
        let Some(a) = AnnouncementService::find(&state.db, id).await? else {
            return Ok(false);
        };
        let Some(dashboard_ref) = a.dashboard_ref.as_deref().filter(|_| a.reactable) else {
            return Ok(false);
        };

        let pages = Self::pages_for(state, &a).await?;
        if pages.cursor() as i64 != a.dashboard_page {
            AnnouncementService::set_dashboard_page(&state.db, a.id, pages.cursor() as i64)
                .await?;
        }

        let view = render::dashboard_view(&a, &pages.current(), state.now());
        match state.outbound().edit(dashboard_ref, &view).await {
            Ok(()) => Ok(true),
            Err(TransportError::NotFound) => {
                warn!("Dashboard for {} is gone; nothing to refresh", a.id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move the cursor one page. The new position is stored before the view is re-rendered.
    pub async fn navigate(
        state: &AppState,
        id: Uuid,
        direction: Direction,
    ) -> Result<View, AppError> {
        let a = AnnouncementService::get(&state.db, id).await?;
        let Some(dashboard_ref) = a.dashboard_ref.as_deref() else {
            return Err(AppError::invalid_state("This announcement has no dashboard."));
        };

        let mut pages = Self::pages_for(state, &a).await?;
        let moved = match direction {
            Direction::Next => pages.advance(),
            Direction::Prev => pages.retreat(),
        };
        if pages.cursor() as i64 != a.dashboard_page {
            AnnouncementService::set_dashboard_page(&state.db, a.id, pages.cursor() as i64)
                .await?;
        }

        let view = render::dashboard_view(&a, &pages.current(), state.now());
        if moved {
            match state.outbound().edit(dashboard_ref, &view).await {
                Ok(()) => {}
                Err(TransportError::NotFound) => {
                    warn!("Dashboard for {} is gone; returning the page only", a.id)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(view)
    }

    /// Re-render every live dashboard at its stored page. Used on startup.
    pub async fn restore_all(state: &AppState) -> Result<usize, AppError> {
        let ids = AnnouncementService::with_dashboards(&state.db).await?;
        let mut restored = 0;
        for id in ids {
            match Self::refresh(state, id).await {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(e) => warn!("Dashboard restore failed for {}: {}", id, e),
            }
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::registration::{NewRegistration, Role};
    use crate::services::aggregation::CohortSummary;
    use crate::services::transport::recording::Call;
    use crate::test_support::{harness, publish_now, t0, test_config};

    fn summary_pages(n: usize) -> Vec<DashboardPage> {
        (0..n)
            .map(|i| DashboardPage::Summary {
                cohorts: vec![CohortSummary {
                    cohort: format!("C{i}"),
                    drivers: 0,
                    riders: 0,
                    capacity: 0,
                    covered: true,
                }],
            })
            .collect()
    }

    #[test]
    fn retreat_at_first_page_is_a_no_op() {
        let mut pages = DashboardPages::new(summary_pages(3), 0);
        assert!(!pages.retreat());
        assert_eq!(pages.cursor(), 0);
    }

    #[test]
    fn advance_at_last_page_is_a_no_op() {
        let mut pages = DashboardPages::new(summary_pages(3), 0);
        assert!(pages.advance());
        assert!(pages.advance());
        assert!(!pages.advance());
        assert_eq!(pages.cursor(), 2);
        assert_eq!(pages.current().position(), "Page 3/3");
        assert!(pages.current().is_last());
    }

    #[test]
    fn shrinking_sequence_clamps_cursor() {
        let mut pages = DashboardPages::new(summary_pages(4), 3);
        assert_eq!(pages.cursor(), 3);
        pages.replace(summary_pages(2));
        assert_eq!(pages.cursor(), 1);
        assert_eq!(DashboardPages::new(summary_pages(2), 7).cursor(), 1);
        assert_eq!(DashboardPages::new(summary_pages(2), -1).cursor(), 0);
    }

    #[test]
    fn empty_sequence_still_has_a_page() {
        let pages = DashboardPages::new(Vec::new(), 5);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages.cursor(), 0);
    }

    #[tokio::test]
    async fn navigation_persists_cursor_and_clamps() {
        let h = harness().await;
        let a = publish_now(&h, true).await;

        DashboardService::navigate(&h.state, a.id, Direction::Prev).await.unwrap();
        let stored = AnnouncementService::get(&h.state.db, a.id).await.unwrap();
        assert_eq!(stored.dashboard_page, 0);

        for _ in 0..10 {
            DashboardService::navigate(&h.state, a.id, Direction::Next).await.unwrap();
        }
        let stored = AnnouncementService::get(&h.state.db, a.id).await.unwrap();
        // summary + 3 cohorts
        assert_eq!(stored.dashboard_page, 3);

        let view = DashboardService::navigate(&h.state, a.id, Direction::Prev).await.unwrap();
        assert!(view.text.ends_with("Page 3/4"));
        let stored = AnnouncementService::get(&h.state.db, a.id).await.unwrap();
        assert_eq!(stored.dashboard_page, 2);
        let dashboard = h.transport.message(stored.dashboard_ref.as_deref().unwrap()).unwrap();
        assert_eq!(dashboard, view);
    }

    #[tokio::test]
    async fn refresh_clamps_a_stale_cursor() {
        let h = harness().await;
        let a = publish_now(&h, true).await;
        AnnouncementService::set_dashboard_page(&h.state.db, a.id, 42).await.unwrap();

        assert!(DashboardService::refresh(&h.state, a.id).await.unwrap());
        let stored = AnnouncementService::get(&h.state.db, a.id).await.unwrap();
        assert_eq!(stored.dashboard_page, 3);
    }

    #[tokio::test]
    async fn refresh_is_a_no_op_without_dashboard() {
        let h = harness().await;
        let a = publish_now(&h, false).await;
        let before = h.transport.calls().len();
        assert!(!DashboardService::refresh(&h.state, a.id).await.unwrap());
        assert!(!DashboardService::refresh(&h.state, Uuid::new_v4()).await.unwrap());
        assert_eq!(h.transport.calls().len(), before);
    }

    #[tokio::test]
    async fn unknown_participants_drop_out_of_the_dashboard() {
        let h = harness().await;
        let a = publish_now(&h, true).await;
        h.transport.add_member("u1", "Ana", &["GT"]);
        h.transport.add_member("u2", "Ben", &["GT"]);
        for (pid, role, capacity) in [("u1", Role::Driver, Some(2)), ("u2", Role::Rider, None)] {
            let reg = NewRegistration {
                participant_id: pid.into(),
                cohort: "GT".into(),
                role,
                capacity,
                contact: None,
                note: None,
            };
            RegistrationService::register(&h.state, a.id, reg).await.unwrap();
        }

        h.transport.remove_member("u2");
        let agg = DashboardService::aggregate_for(&h.state, a.id).await.unwrap();
        let gt = agg.roster("GT").unwrap();
        assert_eq!(gt.drivers.len(), 1);
        assert!(gt.riders.is_empty());
    }

    #[tokio::test]
    async fn restore_rerenders_live_dashboards() {
        let h = harness().await;
        let a = publish_now(&h, true).await;
        publish_now(&h, false).await;

        let restored = DashboardService::restore_all(&h.state).await.unwrap();
        assert_eq!(restored, 1);
        let dashboard_ref = AnnouncementService::get(&h.state.db, a.id)
            .await
            .unwrap()
            .dashboard_ref
            .unwrap();
        assert!(h.transport.calls().contains(&Call::Edit { message_ref: dashboard_ref }));
    }

    #[tokio::test]
    async fn removed_dashboard_is_left_alone() {
        let h = harness().await;
        let a = publish_now(&h, true).await;
        h.transport.drop_message(a.dashboard_ref.as_deref().unwrap());

        assert!(!DashboardService::refresh(&h.state, a.id).await.unwrap());
        let view = DashboardService::navigate(&h.state, a.id, Direction::Next).await.unwrap();
        assert!(view.text.ends_with("Page 2/4"));
        let stored = AnnouncementService::get(&h.state.db, a.id).await.unwrap();
        assert_eq!(stored.dashboard_page, 1);
    }

    #[tokio::test]
    async fn identity_lookups_share_one_timeout() {
        use std::sync::Arc;

        use sqlx::sqlite::SqlitePoolOptions;

        use crate::services::{clock::manual::ManualClock, transport::recording::HangingTransport};

        tokio::time::pause();
        let state = AppState {
            db: SqlitePoolOptions::new()
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_lazy("sqlite::memory:")
                .unwrap(),
            config: Arc::new(test_config()),
            transport: Arc::new(HangingTransport),
            clock: Arc::new(ManualClock::at(t0())),
        };
        let entries: Vec<RegistrationEntry> = (1..=4)
            .map(|i| RegistrationEntry {
                id: i,
                announcement_id: Uuid::nil(),
                participant_id: format!("u{i}"),
                cohort: "GT".into(),
                role: Role::Rider,
                capacity: None,
                contact: None,
                note: None,
                updated_at: t0(),
            })
            .collect();

        let started = tokio::time::Instant::now();
        let resolved = DashboardService::resolve(&state, &entries).await;
        assert!(resolved.is_empty());
        assert!(started.elapsed() < state.config.external_timeout() * 2);
    }
}
