//! Great-circle helpers shared by the stores and the query facade.

use geo::Coord;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6_371.008_8;

/// Haversine distance between two WGS84 coordinates in kilometres.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use foodpoi_core::geodesy::haversine_km;
///
/// let karlsruhe = Coord { x: 8.404435, y: 49.013517 };
/// assert_eq!(haversine_km(karlsruhe, karlsruhe), 0.0);
/// ```
pub fn haversine_km(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let lat1 = from.y.to_radians();
    let lat2 = to.y.to_radians();
    let delta_lat = (to.y - from.y).to_radians();
    let delta_lon = (to.x - from.x).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Project a coordinate onto the unit sphere.
///
/// Straight-line (chord) distance between projected points grows
/// monotonically with great-circle distance, so an R\*-tree over these points
/// yields exact nearest-neighbour order on the sphere.
pub fn unit_sphere(location: Coord<f64>) -> [f64; 3] {
    let lat = location.y.to_radians();
    let lon = location.x.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Wrap longitude into `[-180, 180)` and clamp latitude into `[-90, 90]`.
///
/// Map widgets report positions past the antimeridian once the user has
/// panned around the globe; queries need canonical coordinates.
pub fn normalize(location: Coord<f64>) -> Coord<f64> {
    let lon = (location.x + 180.0).rem_euclid(360.0) - 180.0;
    let lat = location.y.clamp(-90.0, 90.0);
    Coord { x: lon, y: lat }
}
