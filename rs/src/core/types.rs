use crate::core::errors::{ProximityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ProximityError::MalformedData(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ProximityError::MalformedData(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(GeoPoint {
            latitude,
            longitude,
        })
    }

    /// `[lon, lat]`, the axis order used by the spatial index.
    pub fn as_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Lowercases and strips separators so `In Progress`, `in-progress` and
/// `IN_PROGRESS` compare equal.
fn canonical_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisasterType {
    Flood,
    Earthquake,
    Fire,
    Cyclone,
    Landslide,
    Tsunami,
    Drought,
    Storm,
    Accident,
    Other,
}

impl DisasterType {
    /// Never fails: unknown categories collapse into `Other`.
    pub fn parse_lenient(value: &str) -> Self {
        match canonical_token(value).as_str() {
            "flood" | "flooding" => DisasterType::Flood,
            "earthquake" => DisasterType::Earthquake,
            "fire" | "wildfire" => DisasterType::Fire,
            "cyclone" | "hurricane" | "typhoon" => DisasterType::Cyclone,
            "landslide" => DisasterType::Landslide,
            "tsunami" => DisasterType::Tsunami,
            "drought" => DisasterType::Drought,
            "storm" => DisasterType::Storm,
            "accident" => DisasterType::Accident,
            _ => DisasterType::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisasterType::Flood => "flood",
            DisasterType::Earthquake => "earthquake",
            DisasterType::Fire => "fire",
            DisasterType::Cyclone => "cyclone",
            DisasterType::Landslide => "landslide",
            DisasterType::Tsunami => "tsunami",
            DisasterType::Drought => "drought",
            DisasterType::Storm => "storm",
            DisasterType::Accident => "accident",
            DisasterType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl FromStr for Priority {
    type Err = ProximityError;

    fn from_str(s: &str) -> Result<Self> {
        match canonical_token(s).as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(ProximityError::MalformedData(format!(
                "unknown priority '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Verified,
    InProgress,
    Resolved,
    Rejected,
}

impl FromStr for Status {
    type Err = ProximityError;

    fn from_str(s: &str) -> Result<Self> {
        match canonical_token(s).as_str() {
            "pending" => Ok(Status::Pending),
            "verified" => Ok(Status::Verified),
            "inprogress" => Ok(Status::InProgress),
            "resolved" => Ok(Status::Resolved),
            "rejected" => Ok(Status::Rejected),
            _ => Err(ProximityError::MalformedData(format!(
                "unknown status '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Pending => "PENDING",
            Status::Verified => "VERIFIED",
            Status::InProgress => "IN_PROGRESS",
            Status::Resolved => "RESOLVED",
            Status::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: u64,
    pub disaster_type: DisasterType,
    pub priority: Priority,
    pub status: Status,
    /// `None` marks the report as unlocatable.
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub media: Vec<String>,
}

impl Report {
    pub fn is_locatable(&self) -> bool {
        self.location.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceAnnotatedReport {
    pub report: Report,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteSource {
    Provider,
    /// Straight line with a speed-based duration. Approximate, not a routed path.
    StraightLineEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub waypoints: Vec<GeoPoint>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub source: RouteSource,
}

impl Route {
    pub fn is_estimate(&self) -> bool {
        self.source == RouteSource::StraightLineEstimate
    }

    /// Re-checks every waypoint's range, for routes that arrive as raw JSON.
    pub fn validate(&self) -> Result<()> {
        for (index, waypoint) in self.waypoints.iter().enumerate() {
            GeoPoint::new(waypoint.latitude, waypoint.longitude).map_err(|e| {
                ProximityError::MalformedData(format!("waypoint {}: {}", index, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_tolerates_separators() {
        assert_eq!("in progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("IN_PROGRESS".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("Resolved".parse::<Status>().unwrap(), Status::Resolved);
        assert!("closed".parse::<Status>().is_err());
    }

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn unknown_disaster_type_is_other() {
        assert_eq!(DisasterType::parse_lenient("Wildfire"), DisasterType::Fire);
        assert_eq!(DisasterType::parse_lenient("meteor"), DisasterType::Other);
    }

    #[test]
    fn route_validation_catches_bad_waypoints() {
        let mut route: Route = serde_json::from_str(
            r#"{"waypoints": [{"latitude": 28.6, "longitude": 77.2}, {"latitude": 19.0, "longitude": 72.8}],
                "distanceMeters": 1148000.0, "durationSeconds": 103000.0, "source": "provider"}"#,
        )
        .unwrap();
        assert!(route.validate().is_ok());

        route.waypoints[1].latitude = 123.0;
        let err = route.validate().unwrap_err();
        assert!(err.to_string().contains("waypoint 1"));
    }
}
