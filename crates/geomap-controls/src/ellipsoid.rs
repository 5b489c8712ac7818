//! Reference ellipsoid model.
//!
//! The ellipsoid is an oblate spheroid centered at the origin of the
//! Earth-Centered, Earth-Fixed (ECEF) frame, with the equator in the XY plane
//! and the polar axis along +Z.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::geodetic::Geodetic;

/// WGS84 equatorial radius in meters.
pub const WGS84_EQUATORIAL_RADIUS: f64 = 6_378_137.0;
/// WGS84 polar radius in meters.
pub const WGS84_POLAR_RADIUS: f64 = 6_356_752.314_245_179;

/// An oblate spheroid described by its equatorial and polar radii.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    equatorial_radius: f64,
    polar_radius: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

impl Ellipsoid {
    /// The WGS84 reference ellipsoid.
    pub const WGS84: Self = Self {
        equatorial_radius: WGS84_EQUATORIAL_RADIUS,
        polar_radius: WGS84_POLAR_RADIUS,
    };

    /// Create an ellipsoid from its equatorial and polar radii (meters).
    pub fn new(equatorial_radius: f64, polar_radius: f64) -> Result<Self> {
        let valid = |r: f64| r.is_finite() && r > 0.0;
        if !valid(equatorial_radius) || !valid(polar_radius) {
            return Err(ConfigError::InvalidEllipsoid {
                equatorial: equatorial_radius,
                polar: polar_radius,
            });
        }
        Ok(Self {
            equatorial_radius,
            polar_radius,
        })
    }

    /// Equatorial (semi-major) radius.
    pub fn equatorial_radius(&self) -> f64 {
        self.equatorial_radius
    }

    /// Polar (semi-minor) radius.
    pub fn polar_radius(&self) -> f64 {
        self.polar_radius
    }

    /// Radii along the ECEF axes: `(a, a, b)`.
    pub fn radii(&self) -> DVec3 {
        DVec3::new(
            self.equatorial_radius,
            self.equatorial_radius,
            self.polar_radius,
        )
    }

    /// Largest of the three radii.
    pub fn max_radius(&self) -> f64 {
        self.equatorial_radius.max(self.polar_radius)
    }

    /// First eccentricity squared, `1 - b²/a²`.
    pub fn eccentricity_squared(&self) -> f64 {
        1.0 - (self.polar_radius * self.polar_radius)
            / (self.equatorial_radius * self.equatorial_radius)
    }

    /// Unit surface normal of the ellipsoid surface through `position`.
    ///
    /// This is the gradient of the implicit surface equation, so it is the
    /// geodetic "up" direction rather than the geocentric radial direction.
    /// Off the surface it is the gradient direction through `position`, which
    /// differs from the geodetic up of [`crate::LocalFrame`] there.
    /// Returns +Z for the center of the ellipsoid.
    pub fn surface_normal(&self, position: DVec3) -> DVec3 {
        let radii = self.radii();
        (position / (radii * radii)).normalize_or(DVec3::Z)
    }

    /// Nearest intersection of `ray` with the ellipsoid surface.
    ///
    /// Returns `None` when the ray misses or the ellipsoid lies entirely
    /// behind the ray origin. A ray starting inside the ellipsoid returns the
    /// exit point.
    pub fn intersection(&self, ray: &Ray) -> Option<DVec3> {
        // Scale space so the ellipsoid becomes the unit sphere.
        if ray.direction.length_squared() == 0.0 {
            return None;
        }
        let radii = self.radii();
        let origin = ray.origin / radii;
        let direction = ray.direction / radii;

        let a = direction.length_squared();
        let b = 2.0 * origin.dot(direction);
        let c = origin.length_squared() - 1.0;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        // Numerically stable roots; avoids cancellation when the ray starts
        // close to the surface.
        let q = -0.5 * (b + b.signum() * discriminant.sqrt());
        let (near, far) = if q == 0.0 {
            (0.0, 0.0)
        } else {
            let (t0, t1) = (q / a, c / q);
            (t0.min(t1), t0.max(t1))
        };
        let t = if near >= 0.0 {
            near
        } else if far >= 0.0 {
            far
        } else {
            return None;
        };

        Some(ray.at(t))
    }

    /// Signed height of `position` above the surface, along the surface normal.
    pub fn elevation(&self, position: DVec3) -> f64 {
        Geodetic::from_ecef(self, position).height
    }

    /// Distance from the center to the surface point at a geodetic latitude.
    ///
    /// Equal to the equatorial radius at the equator and the polar radius at
    /// the poles.
    pub fn geocentric_radius(&self, latitude: f64) -> f64 {
        let e2 = self.eccentricity_squared();
        let (sin_lat, cos_lat) = latitude.sin_cos();
        let n = self.prime_vertical_radius(sin_lat);
        let x = n * cos_lat;
        let z = n * (1.0 - e2) * sin_lat;
        x.hypot(z)
    }

    /// Distance to the horizon for an observer at `elevation` meters above
    /// the surface at geodetic `latitude` (radians).
    ///
    /// Uses the tangent-line approximation `sqrt(2Rh + h²)`. Negative
    /// elevations are treated as zero, so the result is always real.
    pub fn horizon_distance(&self, latitude: f64, elevation: f64) -> f64 {
        let radius = self.geocentric_radius(latitude);
        let h = elevation.max(0.0);
        (2.0 * radius * h + h * h).sqrt()
    }

    /// Radius of curvature in the prime vertical, `N(φ)`.
    pub(crate) fn prime_vertical_radius(&self, sin_latitude: f64) -> f64 {
        let e2 = self.eccentricity_squared();
        self.equatorial_radius / (1.0 - e2 * sin_latitude * sin_latitude).sqrt()
    }
}

/// A half-line in ECEF space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Starting point.
    pub origin: DVec3,
    /// Direction; not required to be normalized.
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Intersection with the plane through `point` with the given `normal`.
    ///
    /// Returns `None` for rays parallel to the plane or pointing away from it.
    pub fn intersect_plane(&self, normal: DVec3, point: DVec3) -> Option<DVec3> {
        let denominator = normal.dot(self.direction);
        if denominator.abs() <= f64::EPSILON {
            return None;
        }
        let t = normal.dot(point - self.origin) / denominator;
        (t >= 0.0).then(|| self.at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_radii() {
        assert!(Ellipsoid::new(6_378_137.0, 6_356_752.0).is_ok());
        assert!(Ellipsoid::new(0.0, 1.0).is_err());
        assert!(Ellipsoid::new(1.0, -1.0).is_err());
        assert!(Ellipsoid::new(f64::NAN, 1.0).is_err());
        assert!(Ellipsoid::new(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_surface_normal_is_geodetic() {
        let e = Ellipsoid::WGS84;

        // On the equator and at the poles normal and radial direction agree.
        let equator = DVec3::new(e.equatorial_radius(), 0.0, 0.0);
        let pole = DVec3::new(0.0, 0.0, e.polar_radius());
        assert!((e.surface_normal(equator) - DVec3::X).length() < 1e-12);
        assert!((e.surface_normal(pole) - DVec3::Z).length() < 1e-12);

        // At mid latitudes the normal is steeper than the radial direction.
        let p = Geodetic::from_degrees(0.0, 45.0, 0.0).to_ecef(&e);
        let normal = e.surface_normal(p);
        let radial = p.normalize();
        assert!((normal.length() - 1.0).abs() < 1e-12);
        assert!(normal.z > radial.z);
        assert!((normal.z.asin() - 45f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_hits_nearest_point() {
        let e = Ellipsoid::WGS84;
        let ray = Ray::new(DVec3::new(20_000_000.0, 0.0, 0.0), DVec3::NEG_X);
        let hit = e.intersection(&ray).unwrap();
        assert!((hit - DVec3::new(e.equatorial_radius(), 0.0, 0.0)).length() < 1e-6);

        let ray = Ray::new(DVec3::new(0.0, 0.0, 10_000_000.0), DVec3::new(0.0, 0.0, -2.0));
        let hit = e.intersection(&ray).unwrap();
        assert!((hit.z - e.polar_radius()).abs() < 1e-6);
    }

    #[test]
    fn test_intersection_misses() {
        let e = Ellipsoid::WGS84;

        // Pointing away.
        let ray = Ray::new(DVec3::new(20_000_000.0, 0.0, 0.0), DVec3::X);
        assert!(e.intersection(&ray).is_none());

        // Passing beside.
        let ray = Ray::new(DVec3::new(20_000_000.0, 7_000_000.0, 0.0), DVec3::NEG_X);
        assert!(e.intersection(&ray).is_none());

        // Zero direction.
        let ray = Ray::new(DVec3::new(20_000_000.0, 0.0, 0.0), DVec3::ZERO);
        assert!(e.intersection(&ray).is_none());
    }

    #[test]
    fn test_intersection_from_inside_returns_exit() {
        let e = Ellipsoid::WGS84;
        let ray = Ray::new(DVec3::ZERO, DVec3::Y);
        let hit = e.intersection(&ray).unwrap();
        assert!((hit.y - e.equatorial_radius()).abs() < 1e-6);
    }

    #[test]
    fn test_elevation() {
        let e = Ellipsoid::WGS84;
        let p = Geodetic::from_degrees(30.0, 60.0, 1234.5).to_ecef(&e);
        assert!((e.elevation(p) - 1234.5).abs() < 1e-3);

        let below = Geodetic::from_degrees(-120.0, -10.0, -5000.0).to_ecef(&e);
        assert!((e.elevation(below) + 5000.0).abs() < 1e-3);
    }

    #[test]
    fn test_geocentric_radius_bounds() {
        let e = Ellipsoid::WGS84;
        assert!((e.geocentric_radius(0.0) - e.equatorial_radius()).abs() < 1e-6);
        let pole = e.geocentric_radius(std::f64::consts::FRAC_PI_2);
        assert!((pole - e.polar_radius()).abs() < 1e-6);
    }

    #[test]
    fn test_horizon_distance_monotonic_in_elevation() {
        let e = Ellipsoid::WGS84;
        let latitude = 0.7;
        let mut previous = e.horizon_distance(latitude, 0.0);
        assert_eq!(previous, 0.0);
        for step in 1..200 {
            let elevation = f64::from(step) * 50_000.0;
            let distance = e.horizon_distance(latitude, elevation);
            assert!(distance >= previous);
            previous = distance;
        }
    }

    #[test]
    fn test_horizon_distance_monotonic_toward_equator() {
        let e = Ellipsoid::WGS84;
        let elevation = 10_000.0;
        let mut previous = e.horizon_distance(std::f64::consts::FRAC_PI_2, elevation);
        for step in (0..90).rev() {
            let latitude = f64::from(step).to_radians();
            let distance = e.horizon_distance(latitude, elevation);
            assert!(distance >= previous, "latitude {step}");
            previous = distance;

            // Southern hemisphere is symmetric.
            assert!((e.horizon_distance(-latitude, elevation) - distance).abs() < 1e-9);
        }
    }

    #[test]
    fn test_horizon_distance_below_surface_is_real() {
        let e = Ellipsoid::WGS84;
        let distance = e.horizon_distance(0.3, -5000.0);
        assert!(distance.is_finite());
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn test_ray_plane_intersection() {
        let ray = Ray::new(DVec3::new(0.0, 10.0, 0.0), DVec3::NEG_Y);
        let hit = ray.intersect_plane(DVec3::Y, DVec3::new(5.0, 2.0, 5.0)).unwrap();
        assert!((hit - DVec3::new(0.0, 2.0, 0.0)).length() < 1e-12);

        // Parallel.
        let ray = Ray::new(DVec3::new(0.0, 10.0, 0.0), DVec3::X);
        assert!(ray.intersect_plane(DVec3::Y, DVec3::ZERO).is_none());

        // Behind.
        let ray = Ray::new(DVec3::new(0.0, 10.0, 0.0), DVec3::Y);
        assert!(ray.intersect_plane(DVec3::Y, DVec3::ZERO).is_none());
    }
}
