use crate::core::types::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS: f64 = 6371000.0;

/// Great-circle distance in meters on a spherical Earth.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();

    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS * c
}

/// Angular radius in degrees of a great-circle distance.
pub fn meters_to_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS).to_degrees()
}
