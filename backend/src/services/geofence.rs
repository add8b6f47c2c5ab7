//! Optional geofence corroboration of physical presence.

/// Circular zone around a venue center, radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceZone {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

/// Candidate point reported by the scanning device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Tri-state geofence check.
///
/// - No zone configured for the venue: geofencing is opt-in per venue, so
///   the check always passes.
/// - No location (no permission, no fix): unknown, not a failure.
/// - Otherwise: great-circle distance against the radius.
pub fn within_radius(zone: Option<&GeofenceZone>, location: Option<&ScanLocation>) -> Option<bool> {
    let Some(zone) = zone else {
        return Some(true);
    };
    let location = location?;
    let distance = haversine_distance_m(
        location.latitude,
        location.longitude,
        zone.latitude,
        zone.longitude,
    );
    Some(distance <= zone.radius_m)
}

/// Haversine great-circle distance in meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}
