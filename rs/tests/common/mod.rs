#![allow(dead_code)]

use sparkling_hazard_proximity::core::types::{DisasterType, GeoPoint, Priority, Report, Status};

pub fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint {
        latitude,
        longitude,
    }
}

pub fn report(id: u64, location: Option<GeoPoint>, status: Status) -> Report {
    Report {
        id,
        disaster_type: DisasterType::Flood,
        priority: Priority::High,
        status,
        location,
        address: format!("Report {}", id),
        created_at: None,
        media: Vec::new(),
    }
}

pub fn ids<'a, I: IntoIterator<Item = &'a Report>>(reports: I) -> Vec<u64> {
    reports.into_iter().map(|r| r.id).collect()
}

pub fn new_delhi() -> GeoPoint {
    point(28.6139, 77.2090)
}

pub fn mumbai() -> GeoPoint {
    point(19.0760, 72.8777)
}

/// Deterministic scatter of reports around a centre, no RNG crate needed.
pub fn scattered_reports(count: u64, center: GeoPoint, spread_degrees: f64) -> Vec<Report> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 1_000_000) as f64 / 1_000_000.0
    };

    (0..count)
        .map(|i| {
            let lat = (center.latitude + (next() - 0.5) * spread_degrees).clamp(-90.0, 90.0);
            let mut lon = center.longitude + (next() - 0.5) * spread_degrees;
            if lon > 180.0 {
                lon -= 360.0;
            }
            if lon < -180.0 {
                lon += 360.0;
            }
            let status = match i % 5 {
                0 => Status::Resolved,
                1 => Status::Verified,
                2 => Status::InProgress,
                _ => Status::Pending,
            };
            let location = if i % 11 == 0 { None } else { Some(point(lat, lon)) };
            // ids deliberately out of insertion order
            report((count - i) * 7 % 1009 + i, location, status)
        })
        .collect()
}
