//! Representative coordinate for a completed interval.

use crate::classifier::Interval;
use crate::GpsPoint;

/// Arithmetic-mean centroid of an interval's points.
///
/// Latitude and longitude are averaged independently; no geodesic
/// weighting and no accuracy weighting (backlog). Returns `None` for an
/// empty point list, which the classifier never produces.
pub fn centroid(interval: &Interval) -> Option<GpsPoint> {
    if interval.points.is_empty() {
        return None;
    }
    let n = interval.points.len() as f64;
    let (lat_sum, lon_sum) = interval
        .points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
    Some(GpsPoint::new(lat_sum / n, lon_sum / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TrackState;
    use crate::TrackPoint;
    use chrono::{TimeZone, Utc};

    fn interval(coords: &[(f64, f64)]) -> Interval {
        Interval {
            state: TrackState::Resting,
            points: coords
                .iter()
                .enumerate()
                .map(|(i, &(lat, lon))| TrackPoint {
                    time: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
                    latitude: lat,
                    longitude: lon,
                    speed: None,
                    hdop: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_centroid_is_componentwise_mean() {
        let iv = interval(&[(51.0, -0.10), (51.2, -0.14), (51.4, -0.12)]);
        let c = centroid(&iv).unwrap();
        assert!((c.latitude - 51.2).abs() < 1e-9);
        assert!((c.longitude - (-0.12)).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_of_single_point_is_the_point() {
        let iv = interval(&[(51.5074, -0.1278)]);
        let c = centroid(&iv).unwrap();
        assert_eq!(c, GpsPoint::new(51.5074, -0.1278));
    }

    #[test]
    fn test_centroid_of_empty_interval_is_none() {
        let iv = Interval {
            state: TrackState::Resting,
            points: vec![],
        };
        assert!(centroid(&iv).is_none());
    }
}
