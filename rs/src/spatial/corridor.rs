use crate::core::types::{GeoPoint, Report, Status};
use crate::spatial::geometry::{distance_meters, meters_to_degrees};
use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashSet;

/// Above this many waypoint/report pairs the R-tree pays for itself.
const INDEX_THRESHOLD: usize = 50_000;

/// Padding in degrees so envelope edges never cut off a point the exact test accepts.
const ENVELOPE_EPSILON: f64 = 1e-9;

pub fn status_set(statuses: &[Status]) -> FxHashSet<Status> {
    statuses.iter().copied().collect()
}

fn buffer_is_usable(buffer_meters: f64) -> bool {
    !buffer_meters.is_nan() && buffer_meters >= 0.0
}

fn within_buffer(location: &GeoPoint, waypoint: &GeoPoint, buffer_meters: f64) -> bool {
    distance_meters(location, waypoint) <= buffer_meters
}

/// Reports whose status is not excluded and that lie within `buffer_meters`
/// of at least one waypoint, ordered by id.
///
/// A zero buffer admits only reports sitting exactly on a waypoint.
pub fn reports_near_route(
    waypoints: &[GeoPoint],
    reports: &[Report],
    buffer_meters: f64,
    exclude_statuses: &FxHashSet<Status>,
) -> Vec<Report> {
    if waypoints.is_empty() || !buffer_is_usable(buffer_meters) {
        return Vec::new();
    }

    let mut matched: Vec<Report> = reports
        .iter()
        .filter(|report| !exclude_statuses.contains(&report.status))
        .filter(|report| match &report.location {
            Some(location) => waypoints
                .iter()
                .any(|waypoint| within_buffer(location, waypoint, buffer_meters)),
            None => false,
        })
        .cloned()
        .collect();

    matched.sort_by_key(|report| report.id);
    matched
}

/// Same contract as `reports_near_route`, switching to `CorridorIndex` for large inputs.
pub fn scan_corridor(
    waypoints: &[GeoPoint],
    reports: &[Report],
    buffer_meters: f64,
    exclude_statuses: &FxHashSet<Status>,
) -> Vec<Report> {
    if waypoints.len().saturating_mul(reports.len()) < INDEX_THRESHOLD {
        return reports_near_route(waypoints, reports, buffer_meters, exclude_statuses);
    }
    CorridorIndex::new(reports).reports_near_route(waypoints, buffer_meters, exclude_statuses)
}

#[derive(Debug, Clone, PartialEq)]
struct IndexedReport {
    position: [f64; 2],
    slot: usize,
}

impl RTreeObject for IndexedReport {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// R-tree over report positions for long routes or large feeds.
///
/// Produces exactly what `reports_near_route` produces for the same inputs.
pub struct CorridorIndex<'a> {
    reports: &'a [Report],
    tree: RTree<IndexedReport>,
}

impl<'a> CorridorIndex<'a> {
    pub fn new(reports: &'a [Report]) -> Self {
        let points: Vec<IndexedReport> = reports
            .iter()
            .enumerate()
            .filter_map(|(slot, report)| {
                report.location.map(|location| IndexedReport {
                    position: location.as_lon_lat(),
                    slot,
                })
            })
            .collect();

        CorridorIndex {
            reports,
            tree: RTree::bulk_load(points),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn reports_near_route(
        &self,
        waypoints: &[GeoPoint],
        buffer_meters: f64,
        exclude_statuses: &FxHashSet<Status>,
    ) -> Vec<Report> {
        if waypoints.is_empty() || !buffer_is_usable(buffer_meters) {
            return Vec::new();
        }

        let mut slots: FxHashSet<usize> = FxHashSet::default();

        for waypoint in waypoints {
            for envelope in search_envelopes(waypoint, buffer_meters) {
                for candidate in self.tree.locate_in_envelope(&envelope) {
                    if slots.contains(&candidate.slot) {
                        continue;
                    }
                    let report = &self.reports[candidate.slot];
                    if exclude_statuses.contains(&report.status) {
                        continue;
                    }
                    let Some(location) = &report.location else {
                        continue;
                    };
                    if within_buffer(location, waypoint, buffer_meters) {
                        slots.insert(candidate.slot);
                    }
                }
            }
        }

        let mut ordered: Vec<usize> = slots.into_iter().collect();
        ordered.sort_unstable_by_key(|&slot| (self.reports[slot].id, slot));
        ordered
            .into_iter()
            .map(|slot| self.reports[slot].clone())
            .collect()
    }
}

/// Lon/lat boxes that together cover every point within `buffer_meters` of `center`.
fn search_envelopes(center: &GeoPoint, buffer_meters: f64) -> Vec<AABB<[f64; 2]>> {
    let angular = meters_to_degrees(buffer_meters);
    if angular >= 180.0 {
        return vec![AABB::from_corners([-180.0, -90.0], [180.0, 90.0])];
    }

    let lat_min = center.latitude - angular - ENVELOPE_EPSILON;
    let lat_max = center.latitude + angular + ENVELOPE_EPSILON;

    if lat_min <= -90.0 || lat_max >= 90.0 {
        // buffer reaches a pole, every longitude qualifies
        return vec![AABB::from_corners(
            [-180.0, lat_min.max(-90.0)],
            [180.0, lat_max.min(90.0)],
        )];
    }

    let ratio = angular.to_radians().sin() / center.latitude.to_radians().cos();
    let lon_span = if ratio >= 1.0 {
        180.0
    } else {
        ratio.asin().to_degrees() + ENVELOPE_EPSILON
    };
    if lon_span >= 180.0 {
        return vec![AABB::from_corners([-180.0, lat_min], [180.0, lat_max])];
    }

    let lon_min = center.longitude - lon_span;
    let lon_max = center.longitude + lon_span;
    let mut envelopes = vec![AABB::from_corners(
        [lon_min.max(-180.0), lat_min],
        [lon_max.min(180.0), lat_max],
    )];
    if lon_min < -180.0 {
        envelopes.push(AABB::from_corners(
            [lon_min + 360.0, lat_min],
            [180.0, lat_max],
        ));
    }
    if lon_max > 180.0 {
        envelopes.push(AABB::from_corners(
            [-180.0, lat_min],
            [lon_max - 360.0, lat_max],
        ));
    }
    envelopes
}
