pub mod filter;
pub use filter::ReportFilter;

use crate::core::config::ProximityOptions;
use crate::core::errors::ProximityError;
use crate::core::types::{DistanceAnnotatedReport, GeoPoint, Report, Route};
use crate::export::RouteScanExport;
use crate::location::{acquire_location, LocationCache, PositionSource, ResolvedLocation};
use crate::parser::ReportSource;
use crate::routing::{plan_route, DirectionsProvider, RoutePlan};
use crate::spatial::corridor::{scan_corridor, status_set};
use crate::spatial::nearest::{nearest_k, reports_within_radius};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitOutcome {
    Applied,
    /// A newer ticket was issued while this fetch was in flight.
    Stale,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RefreshOutcome {
    Applied { count: usize },
    Stale,
    Closed,
    /// The fetch failed; the previous reports stay in place.
    Failed { notice: String },
}

struct FeedState {
    reports: Arc<Vec<Report>>,
    last_fetched_at: Option<SystemTime>,
    committed_ticket: u64,
    closed: bool,
}

/// Cached report list for one view.
///
/// Each fetch takes a ticket; only the latest issued ticket may commit, and
/// nothing commits once the feed is closed.
pub struct ReportFeed {
    issued: AtomicU64,
    state: Mutex<FeedState>,
}

impl Default for ReportFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFeed {
    pub fn new() -> Self {
        ReportFeed {
            issued: AtomicU64::new(0),
            state: Mutex::new(FeedState {
                reports: Arc::new(Vec::new()),
                last_fetched_at: None,
                committed_ticket: 0,
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn issue_ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_ticket(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn committed_ticket(&self) -> u64 {
        self.state().committed_ticket
    }

    pub fn commit(&self, ticket: u64, reports: Vec<Report>) -> CommitOutcome {
        let mut state = self.state();

        if state.closed {
            log::debug!("Dropping reports for ticket {} after feed closed", ticket);
            return CommitOutcome::Closed;
        }

        let latest = self.latest_ticket();
        if ticket != latest {
            log::debug!(
                "Dropping stale reports for ticket {} (latest is {})",
                ticket,
                latest
            );
            return CommitOutcome::Stale;
        }

        state.reports = Arc::new(reports);
        state.last_fetched_at = Some(SystemTime::now());
        state.committed_ticket = ticket;
        CommitOutcome::Applied
    }

    pub fn reports(&self) -> Arc<Vec<Report>> {
        self.state().reports.clone()
    }

    pub fn last_fetched_at(&self) -> Option<SystemTime> {
        self.state().last_fetched_at
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.reports = Arc::new(Vec::new());
        state.last_fetched_at = None;
    }

    /// Fetches from `source` and commits under a fresh ticket.
    ///
    /// A fetch still running after `fetch_limit` counts as failed.
    pub async fn refresh<S: ReportSource>(&self, source: &S, fetch_limit: Duration) -> RefreshOutcome {
        let ticket = self.issue_ticket();

        let fetched = match timeout(fetch_limit, source.fetch_reports()).await {
            Ok(result) => result,
            Err(_) => Err(ProximityError::Timeout(fetch_limit)),
        };

        match fetched {
            Ok(reports) => {
                let count = reports.len();
                match self.commit(ticket, reports) {
                    CommitOutcome::Applied => RefreshOutcome::Applied { count },
                    CommitOutcome::Stale => RefreshOutcome::Stale,
                    CommitOutcome::Closed => RefreshOutcome::Closed,
                }
            }
            Err(e) => {
                if self.is_closed() {
                    return RefreshOutcome::Closed;
                }
                log::warn!("Report refresh failed, keeping previous reports: {}", e);
                RefreshOutcome::Failed {
                    notice: format!("Could not refresh reports: {}", e),
                }
            }
        }
    }
}

/// Periodic refresh task; dropping the handle aborts it.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Must be called from within a tokio runtime.
///
/// Each fetch is bounded by `fetch_limit`, so one hung request delays the
/// next tick by at most that long.
pub fn spawn_polling<S: ReportSource + 'static>(
    feed: Arc<ReportFeed>,
    source: Arc<S>,
    every: Duration,
    fetch_limit: Duration,
) -> PollHandle {
    let task = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if feed.is_closed() {
                break;
            }
            feed.refresh(source.as_ref(), fetch_limit).await;
        }
    });

    PollHandle { task }
}

/// Everything one view needs, torn down together when the view goes away.
pub struct ViewSession<S: ReportSource + 'static> {
    options: ProximityOptions,
    source: Arc<S>,
    feed: Arc<ReportFeed>,
    location: Mutex<LocationCache>,
    poller: Mutex<Option<PollHandle>>,
}

impl<S: ReportSource + 'static> ViewSession<S> {
    pub fn new(options: ProximityOptions, source: S) -> Self {
        let location = LocationCache::new(options.fallback_origin, options.geolocation_timeout());
        ViewSession {
            options,
            source: Arc::new(source),
            feed: Arc::new(ReportFeed::new()),
            location: Mutex::new(location),
            poller: Mutex::new(None),
        }
    }

    fn location_cache(&self) -> MutexGuard<'_, LocationCache> {
        self.location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn options(&self) -> &ProximityOptions {
        &self.options
    }

    pub fn feed(&self) -> &Arc<ReportFeed> {
        &self.feed
    }

    pub fn reports(&self) -> Arc<Vec<Report>> {
        self.feed.reports()
    }

    pub fn filtered_reports(&self, filter: &ReportFilter) -> Vec<Report> {
        filter.apply(&self.feed.reports())
    }

    /// Starts polling when `pollIntervalSecs` is configured. Needs a tokio runtime.
    pub fn start_polling(&self) -> bool {
        let Some(every) = self.options.poll_interval() else {
            return false;
        };
        if self.feed.is_closed() {
            return false;
        }
        let handle = spawn_polling(
            self.feed.clone(),
            self.source.clone(),
            every,
            self.options.fetch_timeout(),
        );
        *self
            .poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        true
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.feed
            .refresh(self.source.as_ref(), self.options.fetch_timeout())
            .await
    }

    pub fn origin(&self) -> GeoPoint {
        self.location_cache().origin()
    }

    /// Cached location if known, otherwise asks `device` once.
    pub async fn locate<P: PositionSource>(&self, device: &P) -> ResolvedLocation {
        let cached = self.location_cache().cached();
        match cached {
            Some(location) => location,
            None => self.relocate(device).await,
        }
    }

    pub async fn relocate<P: PositionSource>(&self, device: &P) -> ResolvedLocation {
        let (limit, fallback) = {
            let cache = self.location_cache();
            (cache.limit(), cache.fallback())
        };
        let location = acquire_location(device, limit, fallback).await;
        if !self.feed.is_closed() {
            self.location_cache().store(location);
        }
        location
    }

    pub fn nearby(&self, k: Option<usize>) -> Vec<DistanceAnnotatedReport> {
        let k = k.unwrap_or(self.options.nearby_limit);
        nearest_k(&self.origin(), &self.feed.reports(), k)
    }

    pub fn nearby_within(&self, radius_meters: f64) -> Vec<DistanceAnnotatedReport> {
        reports_within_radius(&self.origin(), &self.feed.reports(), radius_meters)
    }

    pub fn reports_near_route(&self, waypoints: &[GeoPoint], buffer_meters: Option<f64>) -> Vec<Report> {
        let buffer = buffer_meters.unwrap_or(self.options.corridor_buffer_meters);
        let excluded = status_set(&self.options.excluded_statuses);
        scan_corridor(waypoints, &self.feed.reports(), buffer, &excluded)
    }

    pub async fn plan_route<P: DirectionsProvider>(
        &self,
        provider: &P,
        from: GeoPoint,
        to: GeoPoint,
    ) -> RoutePlan {
        plan_route(
            provider,
            from,
            to,
            self.options.routing_timeout(),
            self.options.fallback_speed_kmh,
        )
        .await
    }

    pub fn scan_route(&self, route: Route, buffer_meters: Option<f64>) -> RouteScanExport {
        let buffer = buffer_meters.unwrap_or(self.options.corridor_buffer_meters);
        let excluded = status_set(&self.options.excluded_statuses);
        let matched = scan_corridor(&route.waypoints, &self.feed.reports(), buffer, &excluded);
        RouteScanExport::new(route, matched, buffer, &excluded)
    }

    /// Ends the view: stops polling, drops cached data and rejects late commits.
    pub fn close(&self) {
        self.feed.close();
        self.poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        self.location_cache().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.feed.is_closed()
    }
}

impl<S: ReportSource + 'static> Drop for ViewSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}
