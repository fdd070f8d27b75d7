/// Calculate distance between two coordinates using Haversine formula
/// Returns distance in kilometers
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Straight-line pickup-to-drop distance, rounded to 0.1 km.
///
/// `None` unless all four coordinates are known.
pub fn route_distance_km(
    origin_lat: Option<f64>,
    origin_lng: Option<f64>,
    dest_lat: Option<f64>,
    dest_lng: Option<f64>,
) -> Option<f64> {
    let km = haversine_distance(origin_lat?, origin_lng?, dest_lat?, dest_lng?);
    Some((km * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_riyadh_jeddah() {
        let riyadh = (24.7136, 46.6753);
        let jeddah = (21.4858, 39.1925);

        let distance = haversine_distance(riyadh.0, riyadh.1, jeddah.0, jeddah.1);
        // Roughly 850 km as the crow flies
        assert!(distance > 800.0 && distance < 900.0);
    }

    #[test]
    fn test_route_distance_rounds_to_one_decimal() {
        let km = route_distance_km(Some(24.7136), Some(46.6753), Some(24.7743), Some(46.7386)).unwrap();
        assert_eq!(km, (km * 10.0).round() / 10.0);
        assert!(km > 5.0 && km < 15.0);
    }

    #[test]
    fn test_route_distance_needs_all_coordinates() {
        assert_eq!(route_distance_km(Some(24.7), None, Some(21.5), Some(39.2)), None);
        assert_eq!(route_distance_km(None, None, None, None), None);
    }
}
