use crate::core::config::DEFAULT_FALLBACK_SPEED_KMH;
use crate::core::types::{GeoPoint, Route, RouteSource};
use crate::spatial::geometry::distance_meters;

/// Straight line from `from` to `to`, used when the routing provider is unreachable.
///
/// The duration assumes a constant `speed_kmh` and is only an estimate; the
/// returned route is tagged `RouteSource::StraightLineEstimate`. A speed that
/// is not a positive finite number is replaced by the default placeholder.
pub fn fallback_route(from: GeoPoint, to: GeoPoint, speed_kmh: f64) -> Route {
    let speed_kmh = if speed_kmh.is_finite() && speed_kmh > 0.0 {
        speed_kmh
    } else {
        DEFAULT_FALLBACK_SPEED_KMH
    };

    let distance = distance_meters(&from, &to);
    let speed_mps = speed_kmh * 1000.0 / 3600.0;

    Route {
        waypoints: vec![from, to],
        distance_meters: distance,
        duration_seconds: distance / speed_mps,
        source: RouteSource::StraightLineEstimate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_speed() {
        let from = GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
        };
        let to = GeoPoint {
            latitude: 0.0,
            longitude: 1.0,
        };
        let route = fallback_route(from, to, 36.0);
        // 36 km/h is 10 m/s
        assert!((route.duration_seconds - route.distance_meters / 10.0).abs() < 1e-6);
        assert!(route.is_estimate());
    }

    #[test]
    fn invalid_speed_uses_default() {
        let from = GeoPoint {
            latitude: 10.0,
            longitude: 10.0,
        };
        let to = GeoPoint {
            latitude: 10.5,
            longitude: 10.5,
        };
        assert_eq!(
            fallback_route(from, to, -3.0),
            fallback_route(from, to, DEFAULT_FALLBACK_SPEED_KMH)
        );
    }
}
