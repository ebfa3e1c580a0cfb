//! Great-circle distance helpers for the nearby-listings query.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points in decimal degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
}

/// Keep items within `max_km` of the origin, closest first. Items without
/// coordinates are dropped.
pub fn rank_nearby<T>(
    items: Vec<T>,
    coords: impl Fn(&T) -> Option<(f64, f64)>,
    origin_lat: f64,
    origin_lon: f64,
    max_km: f64,
) -> Vec<(T, f64)> {
    let mut ranked: Vec<(T, f64)> = items
        .into_iter()
        .filter_map(|item| {
            let (lat, lon) = coords(&item)?;
            let distance = haversine_km(origin_lat, origin_lon, lat, lon);
            (distance <= max_km).then_some((item, distance))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    // Colombo and Kandy are roughly 94 km apart as the crow flies.
    const COLOMBO: (f64, f64) = (6.9271, 79.8612);
    const KANDY: (f64, f64) = (7.2906, 80.6337);
    const GALLE: (f64, f64) = (6.0535, 80.2210);

    #[test]
    fn test_haversine_known_distance() {
        let d = haversine_km(COLOMBO.0, COLOMBO.1, KANDY.0, KANDY.1);
        assert!((90.0..100.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let d = haversine_km(COLOMBO.0, COLOMBO.1, COLOMBO.0, COLOMBO.1);
        assert!(d < 1e-9);
    }

    #[test]
    fn test_rank_nearby_filters_and_sorts() {
        let items = vec![
            ("kandy", Some(KANDY)),
            ("colombo", Some(COLOMBO)),
            ("galle", Some(GALLE)),
            ("nowhere", None),
        ];
        let ranked = rank_nearby(items, |i| i.1, COLOMBO.0, COLOMBO.1, 150.0);

        let names: Vec<&str> = ranked.iter().map(|(i, _)| i.0).collect();
        assert_eq!(names, vec!["colombo", "kandy", "galle"]);
        assert!(ranked[1].1 < ranked[2].1);
    }

    #[test]
    fn test_rank_nearby_respects_radius() {
        let items = vec![("kandy", Some(KANDY)), ("colombo", Some(COLOMBO))];
        let ranked = rank_nearby(items, |i| i.1, COLOMBO.0, COLOMBO.1, 10.0);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0 .0, "colombo");
    }
}
