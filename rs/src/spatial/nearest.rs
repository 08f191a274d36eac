use crate::core::types::{DistanceAnnotatedReport, GeoPoint, Report};
use crate::spatial::geometry::distance_meters;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Above this many reports the distance pass runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 2048;

fn annotate(origin: &GeoPoint, reports: &[Report]) -> Vec<DistanceAnnotatedReport> {
    let measure = |report: &Report| {
        report.location.map(|location| DistanceAnnotatedReport {
            report: report.clone(),
            distance_meters: distance_meters(origin, &location),
        })
    };

    if reports.len() >= PARALLEL_THRESHOLD {
        reports.par_iter().filter_map(measure).collect()
    } else {
        reports.iter().filter_map(measure).collect()
    }
}

fn by_distance_then_id(a: &DistanceAnnotatedReport, b: &DistanceAnnotatedReport) -> Ordering {
    a.distance_meters
        .partial_cmp(&b.distance_meters)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.report.id.cmp(&b.report.id))
}

/// The `k` locatable reports closest to `origin`, nearest first, ties broken by id.
pub fn nearest_k(origin: &GeoPoint, reports: &[Report], k: usize) -> Vec<DistanceAnnotatedReport> {
    if k == 0 {
        return Vec::new();
    }

    let mut candidates = annotate(origin, reports);
    candidates.sort_unstable_by(by_distance_then_id);
    candidates.truncate(k);
    candidates
}

/// Every locatable report within `radius_meters` of `origin`, nearest first.
pub fn reports_within_radius(
    origin: &GeoPoint,
    reports: &[Report],
    radius_meters: f64,
) -> Vec<DistanceAnnotatedReport> {
    if radius_meters.is_nan() || radius_meters < 0.0 {
        return Vec::new();
    }

    let mut candidates = annotate(origin, reports);
    candidates.retain(|c| c.distance_meters <= radius_meters);
    candidates.sort_unstable_by(by_distance_then_id);
    candidates
}
