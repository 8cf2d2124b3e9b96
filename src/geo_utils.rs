//! Geographic utilities shared across the crate.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Great-circle distance between two GPS points in meters.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(
        Point::new(p1.longitude, p1.latitude),
        Point::new(p2.longitude, p2.latitude),
    )
}

/// Build an openstreetmap.org permalink centered on a point.
pub fn osm_link(point: &GpsPoint) -> String {
    format!(
        "https://www.openstreetmap.org/?mlat={:.6}&mlon={:.6}#map=19/{:.6}/{:.6}",
        point.latitude, point.longitude, point.latitude, point.longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris, roughly 344 km
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        let d = haversine_distance(&london, &paris);
        assert!(d > 330_000.0 && d < 350_000.0);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = GpsPoint::new(51.5074, -0.1278);
        assert!(haversine_distance(&p, &p) < 1e-9);
    }

    #[test]
    fn test_osm_link_contains_coords() {
        let link = osm_link(&GpsPoint::new(51.5074, -0.1278));
        assert!(link.contains("mlat=51.507400"));
        assert!(link.contains("mlon=-0.127800"));
    }
}
