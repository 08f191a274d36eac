use crate::core::errors::{ProximityError, Result};
use crate::core::types::{GeoPoint, Status};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// New Delhi city centre, used whenever the device cannot report a position.
pub const DEFAULT_FALLBACK_ORIGIN: GeoPoint = GeoPoint {
    latitude: 28.6139,
    longitude: 77.2090,
};

/// Placeholder average speed for straight-line duration estimates.
pub const DEFAULT_FALLBACK_SPEED_KMH: f64 = 40.0;

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_routing_server() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_routing_profile() -> String {
    "driving".to_string()
}

fn default_routing_timeout_secs() -> u64 {
    10
}

fn default_geolocation_timeout_secs() -> u64 {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_fallback_origin() -> GeoPoint {
    DEFAULT_FALLBACK_ORIGIN
}

fn default_fallback_speed_kmh() -> f64 {
    DEFAULT_FALLBACK_SPEED_KMH
}

fn default_corridor_buffer_meters() -> f64 {
    1000.0
}

fn default_excluded_statuses() -> Vec<Status> {
    vec![Status::Resolved]
}

fn default_nearby_limit() -> usize {
    5
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProximityOptions {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_routing_server")]
    pub routing_server: String,
    #[serde(default = "default_routing_profile")]
    pub routing_profile: String,
    #[serde(default = "default_routing_timeout_secs")]
    pub routing_timeout_secs: u64,
    #[serde(default = "default_geolocation_timeout_secs")]
    pub geolocation_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default = "default_fallback_origin")]
    pub fallback_origin: GeoPoint,
    #[serde(default = "default_fallback_speed_kmh")]
    pub fallback_speed_kmh: f64,
    #[serde(default = "default_corridor_buffer_meters")]
    pub corridor_buffer_meters: f64,
    #[serde(default = "default_excluded_statuses")]
    pub excluded_statuses: Vec<Status>,
    #[serde(default = "default_nearby_limit")]
    pub nearby_limit: usize,
}

impl Default for ProximityOptions {
    fn default() -> Self {
        ProximityOptions {
            api_base_url: default_api_base_url(),
            routing_server: default_routing_server(),
            routing_profile: default_routing_profile(),
            routing_timeout_secs: default_routing_timeout_secs(),
            geolocation_timeout_secs: default_geolocation_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            poll_interval_secs: None,
            fallback_origin: default_fallback_origin(),
            fallback_speed_kmh: default_fallback_speed_kmh(),
            corridor_buffer_meters: default_corridor_buffer_meters(),
            excluded_statuses: default_excluded_statuses(),
            nearby_limit: default_nearby_limit(),
        }
    }
}

impl ProximityOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: ProximityOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        GeoPoint::new(self.fallback_origin.latitude, self.fallback_origin.longitude)
            .map_err(|e| ProximityError::InvalidOptions(format!("fallbackOrigin: {}", e)))?;

        if !self.fallback_speed_kmh.is_finite() || self.fallback_speed_kmh <= 0.0 {
            return Err(ProximityError::InvalidOptions(format!(
                "fallbackSpeedKmh must be positive, got {}",
                self.fallback_speed_kmh
            )));
        }
        if !self.corridor_buffer_meters.is_finite() || self.corridor_buffer_meters < 0.0 {
            return Err(ProximityError::InvalidOptions(format!(
                "corridorBufferMeters must be non-negative, got {}",
                self.corridor_buffer_meters
            )));
        }
        if self.routing_timeout_secs == 0 {
            return Err(ProximityError::InvalidOptions(
                "routingTimeoutSecs must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ProximityError::InvalidOptions(
                "fetchTimeoutSecs must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_secs == Some(0) {
            return Err(ProximityError::InvalidOptions(
                "pollIntervalSecs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing_timeout_secs)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    /// Upper bound on one `GET /reports`, so a hung request cannot stall polling.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let options = ProximityOptions::from_json("{}").unwrap();
        assert_eq!(options.routing_timeout_secs, 10);
        assert_eq!(options.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(options.excluded_statuses, vec![Status::Resolved]);
        assert_eq!(options.fallback_origin, DEFAULT_FALLBACK_ORIGIN);
        assert!(options.poll_interval().is_none());
    }

    #[test]
    fn rejects_non_positive_speed() {
        let err = ProximityOptions::from_json(r#"{"fallbackSpeedKmh": 0}"#).unwrap_err();
        assert!(matches!(err, ProximityError::InvalidOptions(_)));
    }

    #[test]
    fn reads_camel_case_fields() {
        let options = ProximityOptions::from_json(
            r#"{"corridorBufferMeters": 250.5, "excludedStatuses": ["RESOLVED", "REJECTED"], "pollIntervalSecs": 30}"#,
        )
        .unwrap();
        assert_eq!(options.corridor_buffer_meters, 250.5);
        assert_eq!(
            options.excluded_statuses,
            vec![Status::Resolved, Status::Rejected]
        );
        assert_eq!(options.poll_interval(), Some(Duration::from_secs(30)));
    }
}
