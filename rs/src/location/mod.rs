use crate::core::errors::{LocationFailure, ProximityError};
use crate::core::types::GeoPoint;
use serde::Serialize;
use std::future::Future;
use tokio::time::{timeout, Duration};

/// Device geolocation capability.
pub trait PositionSource: Send + Sync {
    fn current_position(
        &self,
    ) -> impl Future<Output = std::result::Result<GeoPoint, LocationFailure>> + Send;
}

/// A position (or failure) the host platform has already obtained.
#[derive(Debug, Clone, Copy)]
pub struct ReportedPosition(pub std::result::Result<GeoPoint, LocationFailure>);

impl PositionSource for ReportedPosition {
    async fn current_position(&self) -> std::result::Result<GeoPoint, LocationFailure> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub point: GeoPoint,
    pub is_fallback: bool,
    pub failure: Option<LocationFailure>,
}

/// Queries `source` for at most `limit`, substituting `fallback` on any failure.
pub async fn acquire_location<P: PositionSource>(
    source: &P,
    limit: Duration,
    fallback: GeoPoint,
) -> ResolvedLocation {
    let failure = match timeout(limit, source.current_position()).await {
        Ok(Ok(point)) => {
            return ResolvedLocation {
                point,
                is_fallback: false,
                failure: None,
            }
        }
        Ok(Err(failure)) => failure,
        Err(_) => LocationFailure::Timeout,
    };

    log::warn!(
        "{}, using fallback origin ({}, {})",
        ProximityError::LocationUnavailable(failure),
        fallback.latitude,
        fallback.longitude
    );

    ResolvedLocation {
        point: fallback,
        is_fallback: true,
        failure: Some(failure),
    }
}

/// Session-scoped user location. Only an explicit relocate replaces it.
#[derive(Debug, Clone)]
pub struct LocationCache {
    fallback: GeoPoint,
    limit: Duration,
    cached: Option<ResolvedLocation>,
}

impl LocationCache {
    pub fn new(fallback: GeoPoint, limit: Duration) -> Self {
        LocationCache {
            fallback,
            limit,
            cached: None,
        }
    }

    pub fn fallback(&self) -> GeoPoint {
        self.fallback
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn cached(&self) -> Option<ResolvedLocation> {
        self.cached
    }

    /// The cached location, or the fallback when nothing has been resolved yet.
    pub fn origin(&self) -> GeoPoint {
        self.cached.map(|c| c.point).unwrap_or(self.fallback)
    }

    pub fn store(&mut self, location: ResolvedLocation) {
        self.cached = Some(location);
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }
}
