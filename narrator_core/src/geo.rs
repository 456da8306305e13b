//! Great-circle geometry on a spherical earth.
//!
//! Pure functions, no state. Distances use the haversine formula on a
//! sphere of radius [`EARTH_RADIUS_M`]; bearings are initial (forward)
//! azimuths, 0 = north, clockwise positive.

use narrator_env::Coordinate;

/// Mean earth radius used for every distance in the engine (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters.
///
/// Symmetric, and exactly zero when `a == b`.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (delta_lat / 2.0).sin();
    let sin_dlon = (delta_lon / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    // Rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b` in degrees [0, 360).
///
/// Returns 0 when the points coincide.
pub fn bearing_degrees(a: &Coordinate, b: &Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Normalizes an angle into [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Index and distance of the closest candidate, ties resolved to the lowest index.
///
/// `None` candidates are never selected. Returns `None` if nothing qualifies.
pub(crate) fn nearest_index<'a, I>(from: &Coordinate, candidates: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = Option<&'a Coordinate>>,
{
    let mut best: Option<(usize, f64)> = None;

    for (index, candidate) in candidates.into_iter().enumerate() {
        let Some(point) = candidate else { continue };
        let distance = distance_meters(from, point);
        // Strict comparison keeps the earliest index on ties
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((index, distance));
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = Coordinate::new(35.0, 139.0);
        let b = Coordinate::new(36.0, 139.0);
        // ~111.19 km per degree on a 6371 km sphere
        assert_relative_eq!(distance_meters(&a, &b), 111_194.9, epsilon = 1.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(47.0105, 28.8638);
        let b = Coordinate::new(48.1569, 28.2853);
        assert_eq!(distance_meters(&a, &b), distance_meters(&b, &a));
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = Coordinate::new(-33.8688, 151.2093);
        assert_eq!(distance_meters(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_antipodal_is_half_circumference() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        assert_relative_eq!(
            distance_meters(&a, &b),
            std::f64::consts::PI * EARTH_RADIUS_M,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_small_step_north() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.001, 0.0);
        assert_relative_eq!(distance_meters(&a, &b), 111.19, epsilon = 0.01);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Coordinate::new(35.0, 139.0);
        assert_relative_eq!(bearing_degrees(&origin, &Coordinate::new(36.0, 139.0)), 0.0, epsilon = 1e-9);
        assert_relative_eq!(bearing_degrees(&origin, &Coordinate::new(35.0, 140.0)), 90.0, epsilon = 1.0);
        assert_relative_eq!(bearing_degrees(&origin, &Coordinate::new(34.0, 139.0)), 180.0, epsilon = 1e-9);
        assert_relative_eq!(bearing_degrees(&origin, &Coordinate::new(35.0, 138.0)), 270.0, epsilon = 1.0);
    }

    #[test]
    fn test_bearing_same_point_is_zero() {
        let a = Coordinate::new(10.0, 10.0);
        assert_eq!(bearing_degrees(&a, &a), 0.0);
    }

    #[test]
    fn test_bearing_is_in_range() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(-0.0001, -0.0001);
        let bearing = bearing_degrees(&a, &b);
        assert!((0.0..360.0).contains(&bearing));
        assert_relative_eq!(bearing, 225.0, epsilon = 0.1);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert!(normalize_degrees(-1e-18) < 360.0);
    }

    #[test]
    fn test_nearest_index_prefers_lowest_on_tie() {
        let from = Coordinate::new(0.0, 0.0);
        let p = Coordinate::new(0.001, 0.0);
        let q = Coordinate::new(-0.001, 0.0);
        let found = nearest_index(&from, [Some(&p), Some(&q)]);
        assert_eq!(found.map(|(i, _)| i), Some(0));
    }

    #[test]
    fn test_nearest_index_skips_missing() {
        let from = Coordinate::new(0.0, 0.0);
        let far = Coordinate::new(1.0, 0.0);
        let found = nearest_index(&from, [None, Some(&far)]);
        assert_eq!(found.map(|(i, _)| i), Some(1));
        assert_eq!(nearest_index(&from, [None]), None);
    }
}
