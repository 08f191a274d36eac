mod common;

use common::{mumbai, new_delhi, point};
use sparkling_hazard_proximity::core::errors::{ProximityError, Result};
use sparkling_hazard_proximity::core::types::{GeoPoint, Route, RouteSource};
use sparkling_hazard_proximity::routing::{fallback_route, plan_route, DirectionsProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

enum Behaviour {
    Answer,
    Fail,
    Hang,
}

struct FakeDirections {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeDirections {
    fn new(behaviour: Behaviour) -> Self {
        FakeDirections {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DirectionsProvider for FakeDirections {
    async fn directions(&self, from: GeoPoint, to: GeoPoint) -> Result<Route> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Answer => Ok(Route {
                waypoints: vec![from, point(24.0, 75.0), to],
                distance_meters: 1_400_000.0,
                duration_seconds: 72_000.0,
                source: RouteSource::Provider,
            }),
            Behaviour::Fail => Err(ProximityError::Network("connection refused".to_string())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(ProximityError::Network("unreachable".to_string()))
            }
        }
    }
}

#[test]
fn straight_line_delhi_to_mumbai() {
    let route = fallback_route(new_delhi(), mumbai(), 40.0);

    assert_eq!(route.waypoints, vec![new_delhi(), mumbai()]);
    assert!(route.distance_meters > 1_140_000.0 && route.distance_meters < 1_160_000.0);
    assert_eq!(route.source, RouteSource::StraightLineEstimate);
    // 40 km/h over ~1148 km is ~28.7 h
    assert!((route.duration_seconds / 3600.0 - 28.7).abs() < 0.2);
}

#[test]
fn straight_line_between_identical_points() {
    let route = fallback_route(new_delhi(), new_delhi(), 40.0);
    assert_eq!(route.distance_meters, 0.0);
    assert_eq!(route.duration_seconds, 0.0);
}

#[tokio::test]
async fn provider_route_is_used_when_available() {
    let provider = FakeDirections::new(Behaviour::Answer);
    let plan = plan_route(&provider, new_delhi(), mumbai(), Duration::from_secs(10), 40.0).await;

    assert_eq!(plan.route.source, RouteSource::Provider);
    assert_eq!(plan.route.waypoints.len(), 3);
    assert!(plan.notice.is_none());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_error_falls_back_once() {
    let provider = FakeDirections::new(Behaviour::Fail);
    let plan = plan_route(&provider, new_delhi(), mumbai(), Duration::from_secs(10), 40.0).await;

    assert!(plan.route.is_estimate());
    assert_eq!(plan.route.waypoints, vec![new_delhi(), mumbai()]);
    assert!(plan.notice.unwrap().contains("connection refused"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_timeout_falls_back_once() {
    let provider = FakeDirections::new(Behaviour::Hang);
    let started = std::time::Instant::now();
    let plan = plan_route(&provider, new_delhi(), mumbai(), Duration::from_millis(50), 60.0).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(plan.route.is_estimate());
    assert!(plan.notice.is_some());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(plan.route, fallback_route(new_delhi(), mumbai(), 60.0));
}
