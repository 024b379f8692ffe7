/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two WGS84 points, in kilometres.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        assert_eq!(distance_km(12.97, 77.59, 12.97, 77.59), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_on_the_equator() {
        let d = distance_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn known_city_pair() {
        // Bengaluru -> Chennai, roughly 290 km as the crow flies.
        let d = distance_km(12.9716, 77.5946, 13.0827, 80.2707);
        assert!((d - 290.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let there = distance_km(51.5, -0.12, 48.85, 2.35);
        let back = distance_km(48.85, 2.35, 51.5, -0.12);
        assert!((there - back).abs() < 1e-9);
    }
}
