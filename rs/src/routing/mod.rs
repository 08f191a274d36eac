pub mod fallback;
pub use fallback::fallback_route;

use crate::core::config::ProximityOptions;
use crate::core::errors::{ProximityError, Result};
use crate::core::types::{GeoPoint, Route, RouteSource};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{timeout, Duration};

/// External turn-by-turn routing service.
pub trait DirectionsProvider: Send + Sync {
    fn directions(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> impl Future<Output = Result<Route>> + Send;
}

/// Client for an OSRM-compatible `/route/v1` endpoint.
#[derive(Clone, Debug)]
pub struct OsrmDirections {
    client: reqwest::Client,
    server: String,
    profile: String,
}

impl OsrmDirections {
    pub fn new(server: &str, profile: &str) -> Self {
        OsrmDirections {
            client: reqwest::Client::new(),
            server: server.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
        }
    }

    pub fn from_options(options: &ProximityOptions) -> Self {
        Self::new(&options.routing_server, &options.routing_profile)
    }

    pub fn route_url(&self, from: &GeoPoint, to: &GeoPoint) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.server, self.profile, from.longitude, from.latitude, to.longitude, to.latitude
        )
    }
}

impl DirectionsProvider for OsrmDirections {
    async fn directions(&self, from: GeoPoint, to: GeoPoint) -> Result<Route> {
        let response = self.client.get(self.route_url(&from, &to)).send().await?;

        if !response.status().is_success() {
            return Err(ProximityError::Network(format!(
                "routing server answered {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_osrm_route(&body, from, to)
    }
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

pub fn parse_osrm_route(body: &str, from: GeoPoint, to: GeoPoint) -> Result<Route> {
    let response: OsrmResponse = serde_json::from_str(body)?;

    if response.code != "Ok" {
        return Err(ProximityError::Network(format!(
            "routing failed with code {}: {}",
            response.code,
            response.message.unwrap_or_default()
        )));
    }

    let best = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProximityError::MalformedData("routing response has no routes".to_string()))?;

    let mut waypoints = best
        .geometry
        .coordinates
        .iter()
        .map(|&[lon, lat]| GeoPoint::new(lat, lon))
        .collect::<Result<Vec<_>>>()?;

    if waypoints.is_empty() {
        waypoints = vec![from, to];
    }

    Ok(Route {
        waypoints,
        distance_meters: best.distance,
        duration_seconds: best.duration,
        source: RouteSource::Provider,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub route: Route,
    /// Non-blocking message for the user when the route is only an estimate.
    pub notice: Option<String>,
}

/// Asks the provider for a route, giving it at most `limit`.
///
/// A provider error or timeout produces exactly one straight-line fallback;
/// the provider is never retried.
pub async fn plan_route<P: DirectionsProvider>(
    provider: &P,
    from: GeoPoint,
    to: GeoPoint,
    limit: Duration,
    speed_kmh: f64,
) -> RoutePlan {
    let failure = match timeout(limit, provider.directions(from, to)).await {
        Ok(Ok(route)) => {
            return RoutePlan {
                route,
                notice: None,
            }
        }
        Ok(Err(e)) => e,
        Err(_) => ProximityError::Timeout(limit),
    };

    log::warn!(
        "Routing provider unavailable, using straight-line estimate: {}",
        failure
    );

    RoutePlan {
        route: fallback_route(from, to, speed_kmh),
        notice: Some(format!(
            "Routing service unavailable ({}). Showing a straight-line estimate.",
            failure
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delhi() -> GeoPoint {
        GeoPoint {
            latitude: 28.6139,
            longitude: 77.2090,
        }
    }

    fn noida() -> GeoPoint {
        GeoPoint {
            latitude: 28.5355,
            longitude: 77.3910,
        }
    }

    #[test]
    fn parses_geojson_geometry() {
        let body = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 21500.4,
                "duration": 1830.2,
                "geometry": {"type": "LineString", "coordinates": [[77.2090, 28.6139], [77.30, 28.57], [77.3910, 28.5355]]}
            }]
        }"#;
        let route = parse_osrm_route(body, delhi(), noida()).unwrap();
        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(route.waypoints[1].latitude, 28.57);
        assert_eq!(route.source, RouteSource::Provider);
        assert_eq!(route.distance_meters, 21500.4);
    }

    #[test]
    fn rejects_non_ok_code() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route"}"#;
        let err = parse_osrm_route(body, delhi(), noida()).unwrap_err();
        assert!(matches!(err, ProximityError::Network(_)));
    }

    #[test]
    fn url_uses_lon_lat_order() {
        let provider = OsrmDirections::new("http://osrm.local/", "driving");
        assert_eq!(
            provider.route_url(&delhi(), &noida()),
            "http://osrm.local/route/v1/driving/77.209,28.6139;77.391,28.5355?overview=full&geometries=geojson"
        );
    }
}
