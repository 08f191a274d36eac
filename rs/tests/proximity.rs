mod common;

use common::{ids, mumbai, new_delhi, point, report, scattered_reports};
use sparkling_hazard_proximity::core::types::Status;
use sparkling_hazard_proximity::spatial::{distance_meters, nearest_k, reports_within_radius};

#[test]
fn distance_to_self_is_zero() {
    for p in [new_delhi(), mumbai(), point(90.0, 0.0), point(-45.0, -180.0)] {
        assert_eq!(distance_meters(&p, &p), 0.0);
    }
}

#[test]
fn distance_is_symmetric() {
    let pairs = [
        (new_delhi(), mumbai()),
        (point(51.5074, -0.1278), point(48.8566, 2.3522)),
        (point(0.0, 179.5), point(0.0, -179.5)),
    ];
    for (a, b) in pairs {
        assert_eq!(distance_meters(&a, &b), distance_meters(&b, &a));
    }
}

#[test]
fn triangle_inequality_holds() {
    let points: Vec<_> = scattered_reports(40, point(0.0, 170.0), 150.0)
        .iter()
        .filter_map(|r| r.location)
        .chain([new_delhi(), mumbai(), point(90.0, 0.0)])
        .collect();
    assert!(points.len() > 30);

    for a in &points {
        for b in &points {
            for c in &points {
                let direct = distance_meters(a, c);
                let detour = distance_meters(a, b) + distance_meters(b, c);
                assert!(direct <= detour + 1e-6, "{:?} {:?} {:?}", a, b, c);
            }
        }
    }
}

#[test]
fn distance_crosses_antimeridian_the_short_way() {
    let d = distance_meters(&point(0.0, 179.5), &point(0.0, -179.5));
    assert!((d - 111_195.0).abs() < 10.0);
}

#[test]
fn nearest_k_new_delhi_scenario() {
    let reports = vec![
        report(1, Some(point(28.6145, 77.2100)), Status::Pending),
        report(2, Some(mumbai()), Status::Pending),
        report(3, None, Status::Pending),
    ];

    let nearest = nearest_k(&new_delhi(), &reports, 2);

    assert_eq!(nearest.len(), 2);
    assert_eq!(nearest[0].report.id, 1);
    assert_eq!(nearest[1].report.id, 2);
    assert!((nearest[0].distance_meters - 118.0).abs() < 5.0);
    assert!(nearest[1].distance_meters > 1_100_000.0);
}

#[test]
fn nearest_k_never_exceeds_locatable_count() {
    let reports = vec![
        report(1, None, Status::Pending),
        report(2, Some(mumbai()), Status::Resolved),
    ];
    let nearest = nearest_k(&new_delhi(), &reports, 10);
    assert_eq!(ids(nearest.iter().map(|n| &n.report)), vec![2]);
}

#[test]
fn nearest_k_of_nothing_is_empty() {
    assert!(nearest_k(&new_delhi(), &[], 5).is_empty());
    let reports = vec![report(1, Some(mumbai()), Status::Pending)];
    assert!(nearest_k(&new_delhi(), &reports, 0).is_empty());
}

#[test]
fn nearest_k_breaks_ties_by_id() {
    let same_spot = point(28.70, 77.10);
    let reports = vec![
        report(30, Some(same_spot), Status::Pending),
        report(10, Some(same_spot), Status::Pending),
        report(20, Some(same_spot), Status::Pending),
    ];
    let nearest = nearest_k(&new_delhi(), &reports, 3);
    assert_eq!(ids(nearest.iter().map(|n| &n.report)), vec![10, 20, 30]);
}

#[test]
fn nearest_k_is_sorted_on_large_inputs() {
    let reports = scattered_reports(5000, new_delhi(), 4.0);
    let nearest = nearest_k(&new_delhi(), &reports, 200);

    assert_eq!(nearest.len(), 200);
    for pair in nearest.windows(2) {
        let ordered = pair[0].distance_meters < pair[1].distance_meters
            || (pair[0].distance_meters == pair[1].distance_meters
                && pair[0].report.id <= pair[1].report.id);
        assert!(ordered);
    }
    assert!(nearest.iter().all(|n| n.report.location.is_some()));
}

#[test]
fn within_radius_keeps_only_close_reports() {
    let reports = vec![
        report(5, Some(point(28.6145, 77.2100)), Status::Pending),
        report(6, Some(point(28.62, 77.21)), Status::Verified),
        report(7, Some(mumbai()), Status::Pending),
        report(8, None, Status::Pending),
    ];
    let nearby = reports_within_radius(&new_delhi(), &reports, 2_000.0);
    assert_eq!(ids(nearby.iter().map(|n| &n.report)), vec![5, 6]);
    assert!(reports_within_radius(&new_delhi(), &reports, -1.0).is_empty());
}
