//! Conversions between geodetic coordinates and ECEF vectors.
//!
//! Geodetic coordinates are longitude/latitude in radians and height in
//! meters above the reference ellipsoid. The ECEF frame has its origin at the
//! ellipsoid center, +X through (0°, 0°), +Y through (90°E, 0°) and +Z
//! through the north pole.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::ellipsoid::Ellipsoid;

/// Latitude change below which the iterative solution is considered converged.
const LATITUDE_TOLERANCE: f64 = 1e-14;
/// Maximum number of refinement iterations after the initial Bowring estimate.
const MAX_ITERATIONS: usize = 6;

/// A position given by longitude, latitude (radians) and height (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geodetic {
    /// Longitude in radians, within (-π, π].
    pub longitude: f64,
    /// Geodetic latitude in radians, within [-π/2, π/2].
    pub latitude: f64,
    /// Height above the ellipsoid surface in meters.
    pub height: f64,
}

impl Geodetic {
    /// Create a geodetic position, wrapping longitude and clamping latitude.
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude: wrap_longitude(longitude),
            latitude: latitude.clamp(-FRAC_PI_2, FRAC_PI_2),
            height,
        }
    }

    /// Create a geodetic position from longitude/latitude in degrees.
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(longitude.to_radians(), latitude.to_radians(), height)
    }

    /// Longitude in degrees.
    pub fn longitude_degrees(&self) -> f64 {
        self.longitude.to_degrees()
    }

    /// Latitude in degrees.
    pub fn latitude_degrees(&self) -> f64 {
        self.latitude.to_degrees()
    }

    /// Convert to an ECEF position on the given ellipsoid.
    pub fn to_ecef(&self, ellipsoid: &Ellipsoid) -> DVec3 {
        let (sin_lat, cos_lat) = self.latitude.sin_cos();
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        let n = ellipsoid.prime_vertical_radius(sin_lat);
        let e2 = ellipsoid.eccentricity_squared();

        DVec3::new(
            (n + self.height) * cos_lat * cos_lon,
            (n + self.height) * cos_lat * sin_lon,
            (n * (1.0 - e2) + self.height) * sin_lat,
        )
    }

    /// Convert an ECEF position to geodetic coordinates.
    ///
    /// Starts from Bowring's closed-form estimate and refines the parametric
    /// latitude until the geodetic latitude stops changing, which keeps the
    /// result accurate for positions far above the surface.
    pub fn from_ecef(ellipsoid: &Ellipsoid, position: DVec3) -> Self {
        let a = ellipsoid.equatorial_radius();
        let b = ellipsoid.polar_radius();
        let e2 = ellipsoid.eccentricity_squared();
        let ep2 = (a * a - b * b) / (b * b);

        let p = position.x.hypot(position.y);
        let z = position.z;

        if p == 0.0 && z == 0.0 {
            return Self::new(0.0, 0.0, -a);
        }

        let longitude = if p == 0.0 {
            0.0
        } else {
            position.y.atan2(position.x)
        };

        let bowring = |beta: f64| {
            let (sin_beta, cos_beta) = beta.sin_cos();
            (z + ep2 * b * sin_beta.powi(3)).atan2(p - e2 * a * cos_beta.powi(3))
        };

        let mut latitude = bowring((a * z).atan2(b * p));
        for _ in 0..MAX_ITERATIONS {
            let (sin_lat, cos_lat) = latitude.sin_cos();
            let next = bowring((b * sin_lat).atan2(a * cos_lat));
            let converged = (next - latitude).abs() < LATITUDE_TOLERANCE;
            latitude = next;
            if converged {
                break;
            }
        }

        let (sin_lat, cos_lat) = latitude.sin_cos();
        let n = ellipsoid.prime_vertical_radius(sin_lat);
        // Divide by whichever of cos/sin is larger to stay well conditioned.
        let height = if cos_lat.abs() >= sin_lat.abs() {
            p / cos_lat - n
        } else {
            z / sin_lat - n * (1.0 - e2)
        };

        Self::new(longitude, latitude, height)
    }
}

/// Convert longitude/latitude in degrees and height in meters to ECEF on WGS84.
pub fn lon_lat_to_ecef(longitude_deg: f64, latitude_deg: f64, height: f64) -> DVec3 {
    Geodetic::from_degrees(longitude_deg, latitude_deg, height).to_ecef(&Ellipsoid::WGS84)
}

/// Wrap a longitude into (-π, π].
pub fn wrap_longitude(longitude: f64) -> f64 {
    if !longitude.is_finite() {
        return 0.0;
    }
    let wrapped = (longitude + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { PI } else { wrapped }
}

/// East/north/up basis at a point on or above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// Unit vector toward increasing longitude.
    pub east: DVec3,
    /// Unit vector toward increasing latitude.
    pub north: DVec3,
    /// Ellipsoid surface normal.
    pub up: DVec3,
}

impl LocalFrame {
    /// Build the local frame at an ECEF position.
    pub fn at(ellipsoid: &Ellipsoid, position: DVec3) -> Self {
        Self::from_geodetic(&Geodetic::from_ecef(ellipsoid, position))
    }

    /// Build the local frame from geodetic coordinates.
    ///
    /// The vectors are the normalized partial derivatives of the geodetic
    /// parameterization with respect to longitude and latitude, and the
    /// surface normal at that latitude.
    pub fn from_geodetic(geodetic: &Geodetic) -> Self {
        let (sin_lat, cos_lat) = geodetic.latitude.sin_cos();
        let (sin_lon, cos_lon) = geodetic.longitude.sin_cos();

        Self {
            east: DVec3::new(-sin_lon, cos_lon, 0.0),
            north: DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
            up: DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
        }
    }

    /// Rotation taking local (east, north, up) coordinates to ECEF.
    pub fn to_matrix(&self) -> DMat3 {
        DMat3::from_cols(self.east, self.north, self.up)
    }
}
