use crate::core::config::ProximityOptions;
use crate::core::errors::{ProximityError, Result};
use crate::core::types::{DisasterType, GeoPoint, Priority, Report, Status};
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;

/// Anything that can produce the current report list.
pub trait ReportSource: Send + Sync {
    fn fetch_reports(&self) -> impl Future<Output = Result<Vec<Report>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedBatch {
    pub reports: Vec<Report>,
    pub rejected: Vec<RejectedRecord>,
}

pub fn parse_reports_json(json: &str) -> Result<NormalizedBatch> {
    let payload: Value = serde_json::from_str(json)?;
    normalize_reports(&payload)
}

/// Accepts a bare array or an object wrapping it under `reports` or `data`.
pub fn normalize_reports(payload: &Value) -> Result<NormalizedBatch> {
    let records = match payload {
        Value::Array(items) => items,
        Value::Object(obj) => match field(obj, &["reports", "data"]) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ProximityError::MalformedData(
                    "report payload has no reports array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ProximityError::MalformedData(
                "report payload is neither an array nor an object".to_string(),
            ))
        }
    };

    let mut batch = NormalizedBatch::default();
    for (index, record) in records.iter().enumerate() {
        match normalize_report(record) {
            Ok(report) => batch.reports.push(report),
            Err(e) => batch.rejected.push(RejectedRecord {
                index,
                reason: e.to_string(),
            }),
        }
    }

    if !batch.rejected.is_empty() {
        log::warn!(
            "Skipped {} of {} report records that failed to normalize",
            batch.rejected.len(),
            records.len()
        );
    }

    Ok(batch)
}

pub fn normalize_report(record: &Value) -> Result<Report> {
    let obj = record
        .as_object()
        .ok_or_else(|| ProximityError::MalformedData("report is not an object".to_string()))?;

    let id = parse_id(field(obj, &["id", "_id", "reportId"]))?;

    // absent means new; anything present must name a known status
    let status = match field(obj, &["status"]) {
        None => Status::Pending,
        Some(Value::String(raw)) => raw.parse::<Status>()?,
        Some(other) => {
            return Err(ProximityError::MalformedData(format!(
                "report {} has non-string status {}",
                id, other
            )))
        }
    };

    let priority = match field(obj, &["priority"]).and_then(Value::as_str) {
        Some(raw) => raw.parse::<Priority>().unwrap_or_else(|_| {
            log::debug!("Report {} has unknown priority '{}'", id, raw);
            Priority::Medium
        }),
        None => Priority::Medium,
    };

    let disaster_type = field(obj, &["disasterType", "disaster_type", "type"])
        .and_then(Value::as_str)
        .map(DisasterType::parse_lenient)
        .unwrap_or(DisasterType::Other);

    let location = extract_location(obj);
    if location.is_none() {
        log::debug!("Report {} is unlocatable", id);
    }

    let address = field(obj, &["address", "locationName"])
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let created_at = field(obj, &["createdAt", "created_at", "timestamp"]).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    Ok(Report {
        id,
        disaster_type,
        priority,
        status,
        location,
        address,
        created_at,
        media: extract_media(obj),
    })
}

/// First present, non-null value among the aliases.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|value| !value.is_null())
}

fn parse_id(value: Option<&Value>) -> Result<u64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ProximityError::MalformedData(format!("invalid report id {:?}", value)))
}

/// A number or a numeric string. Blank strings and non-finite values are rejected.
fn coordinate(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Both coordinates or nothing; never defaults a missing half to zero.
fn extract_location(obj: &Map<String, Value>) -> Option<GeoPoint> {
    let (lat, lon) = match field(obj, &["location", "coordinates"]) {
        Some(Value::Object(nested)) => match nested.get("coordinates") {
            // GeoJSON point: [lon, lat]
            Some(Value::Array(pair)) if pair.len() == 2 => {
                (coordinate(pair.get(1)), coordinate(pair.first()))
            }
            _ => (
                coordinate(field(nested, &["latitude", "lat"])),
                coordinate(field(nested, &["longitude", "lng", "lon"])),
            ),
        },
        _ => (
            coordinate(field(obj, &["latitude", "lat"])),
            coordinate(field(obj, &["longitude", "lng", "lon"])),
        ),
    };

    GeoPoint::new(lat?, lon?).ok()
}

fn extract_media(obj: &Map<String, Value>) -> Vec<String> {
    match field(obj, &["media", "images"]) {
        Some(Value::String(url)) => vec![url.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(url) => Some(url.clone()),
                Value::Object(entry) => field(entry, &["url", "path"])
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `GET {api_base_url}/reports`.
#[derive(Clone, Debug)]
pub struct HttpReportSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReportSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(HttpReportSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_options(options: &ProximityOptions) -> Result<Self> {
        Self::new(&options.api_base_url, options.fetch_timeout())
    }

    pub fn reports_url(&self) -> String {
        format!("{}/reports", self.base_url)
    }
}

impl ReportSource for HttpReportSource {
    async fn fetch_reports(&self) -> Result<Vec<Report>> {
        let response = self.client.get(self.reports_url()).send().await?;

        if !response.status().is_success() {
            return Err(ProximityError::Network(format!(
                "reports endpoint answered {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        Ok(normalize_reports(&payload)?.reports)
    }
}
