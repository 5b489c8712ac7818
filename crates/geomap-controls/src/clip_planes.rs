//! Near/far plane fitting for cameras viewing a whole globe.
//!
//! A fixed near/far pair cannot cover both orbit altitudes (tens of thousands
//! of kilometers) and street level without losing depth precision, so the
//! planes are recomputed each frame once the camera pose is final.

use glam::DAffine3;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraProjection, CameraState};
use crate::ellipsoid::Ellipsoid;
use crate::error::{ConfigError, Result};
use crate::geodetic::Geodetic;

/// Near plane distance near the surface.
const SURFACE_MIN_NEAR: f64 = 1.0;
/// Near plane distance once the camera is a full margin above the surface.
const ORBIT_MIN_NEAR: f64 = 1000.0;
/// Slack added to the far plane so the horizon itself is not clipped.
const FAR_EPSILON: f64 = 0.1;

/// Settings for [`GlobeClipPlaneAdjuster`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipPlaneSettings {
    /// Fraction of the largest radius kept in front of the globe as margin.
    pub near_margin: f64,
    /// Fraction of the largest radius added beyond the far plane.
    pub far_margin: f64,
    /// Lowest elevation used for the horizon distance, so the far plane
    /// stays usable at or below sea level.
    pub min_elevation: f64,
    /// Placement of the ellipsoid in world space.
    #[serde(skip)]
    pub ellipsoid_frame: DAffine3,
}

impl Default for ClipPlaneSettings {
    fn default() -> Self {
        Self {
            near_margin: 0.25,
            far_margin: 0.0,
            min_elevation: 2550.0,
            ellipsoid_frame: DAffine3::IDENTITY,
        }
    }
}

impl ClipPlaneSettings {
    /// Check margins and the ellipsoid frame.
    pub fn validate(&self) -> Result<()> {
        for (setting, value) in [
            ("near margin", self.near_margin),
            ("far margin", self.far_margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    setting,
                    value,
                    expected: "a finite non-negative value",
                });
            }
        }
        if !self.min_elevation.is_finite() {
            return Err(ConfigError::OutOfRange {
                setting: "min elevation",
                value: self.min_elevation,
                expected: "a finite value",
            });
        }
        let determinant = self.ellipsoid_frame.matrix3.determinant();
        if !determinant.is_finite() || determinant == 0.0 || !self.ellipsoid_frame.is_finite() {
            return Err(ConfigError::OutOfRange {
                setting: "ellipsoid frame determinant",
                value: determinant,
                expected: "an invertible transform",
            });
        }
        Ok(())
    }
}

/// Resulting clip plane distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlanes {
    /// Near plane distance in meters.
    pub near: f64,
    /// Far plane distance in meters.
    pub far: f64,
}

/// Fits camera clip planes to the visible part of a globe.
#[derive(Debug, Clone)]
pub struct GlobeClipPlaneAdjuster {
    ellipsoid: Ellipsoid,
    settings: ClipPlaneSettings,
    frame_inverse: DAffine3,
}

impl GlobeClipPlaneAdjuster {
    /// Create an adjuster for `ellipsoid`, validating `settings`.
    pub fn new(ellipsoid: Ellipsoid, settings: ClipPlaneSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            ellipsoid,
            frame_inverse: settings.ellipsoid_frame.inverse(),
            settings,
        })
    }

    /// Current settings.
    pub fn settings(&self) -> &ClipPlaneSettings {
        &self.settings
    }

    /// Update the camera's near and far planes.
    ///
    /// Orthographic cameras are additionally moved forward so that the near
    /// plane sits at zero. Custom projections are left untouched.
    pub fn adjust(&self, camera: &mut CameraState) -> ClipPlanes {
        let max_radius = self.ellipsoid.max_radius();
        let center = self.settings.ellipsoid_frame.translation;

        let (near, far) = match camera.projection {
            CameraProjection::Perspective { .. } => {
                let distance_to_center = camera.position.distance(center);

                // Interpolate from the margin around the globe down to the
                // surface to avoid z-fighting from a far-off near plane.
                let margin = self.settings.near_margin * max_radius;
                let alpha = if margin > 0.0 {
                    ((distance_to_center - max_radius) / margin).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let min_near = SURFACE_MIN_NEAR + (ORBIT_MIN_NEAR - SURFACE_MIN_NEAR) * alpha;
                let near = min_near.max(distance_to_center - max_radius - margin);

                let local = self.frame_inverse.transform_point3(camera.position);
                let geodetic = Geodetic::from_ecef(&self.ellipsoid, local);
                let elevation = geodetic.height.max(self.settings.min_elevation);
                let horizon = self.ellipsoid.horizon_distance(geodetic.latitude, elevation);
                let far = horizon + FAR_EPSILON + max_radius * self.settings.far_margin;

                (near, far)
            }
            CameraProjection::Orthographic { .. } => {
                let distance_to_center = -camera.world_to_local(center).z;
                let near = distance_to_center - max_radius * (1.0 + self.settings.near_margin);
                let far = distance_to_center + FAR_EPSILON + max_radius * self.settings.far_margin;

                // Slide the camera up to the near plane so depth starts at zero.
                camera.position += camera.forward() * near;
                (0.0, far - near)
            }
            CameraProjection::Custom { near, far } => return ClipPlanes { near, far },
        };

        camera.projection.set_clip_planes(near, far);
        ClipPlanes { near, far }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn adjuster() -> GlobeClipPlaneAdjuster {
        GlobeClipPlaneAdjuster::new(Ellipsoid::WGS84, ClipPlaneSettings::default()).unwrap()
    }

    fn perspective_at(position: DVec3) -> CameraState {
        let mut camera = CameraState::perspective(0.8, 1.5, 1.0, 1e9);
        camera.position = position;
        camera.up = DVec3::Z;
        camera.look_at(DVec3::ZERO);
        camera
    }

    #[test]
    fn test_perspective_high_orbit() {
        let e = Ellipsoid::WGS84;
        let altitude = 10_000_000.0;
        let mut camera = perspective_at(DVec3::X * (e.equatorial_radius() + altitude));
        let planes = adjuster().adjust(&mut camera);

        let margin = 0.25 * e.max_radius();
        assert!((planes.near - (altitude - margin)).abs() < 1e-6);

        let expected_far = e.horizon_distance(0.0, altitude) + 0.1;
        assert!((planes.far - expected_far).abs() < 1e-3);
        assert_eq!(camera.projection.near(), planes.near);
        assert_eq!(camera.projection.far(), planes.far);
    }

    #[test]
    fn test_perspective_near_surface() {
        let e = Ellipsoid::WGS84;
        let mut camera = perspective_at(DVec3::X * (e.equatorial_radius() + 100.0));
        let planes = adjuster().adjust(&mut camera);

        assert!(planes.near >= 1.0 && planes.near < 1.1, "{planes:?}");

        // Below the minimum elevation the horizon is computed at 2550 m.
        let expected_far = e.horizon_distance(0.0, 2550.0) + 0.1;
        assert!((planes.far - expected_far).abs() < 1e-3);
    }

    #[test]
    fn test_perspective_below_surface() {
        let e = Ellipsoid::WGS84;
        let mut camera = perspective_at(DVec3::X * (e.equatorial_radius() - 5000.0));
        let planes = adjuster().adjust(&mut camera);

        assert!(planes.far.is_finite() && planes.far > 0.0);
        assert!(planes.near > 0.0 && planes.near < planes.far);
    }

    #[test]
    fn test_orthographic_moves_camera_to_near() {
        let e = Ellipsoid::WGS84;
        let start = DVec3::X * (e.equatorial_radius() + 1_000_000.0);
        let mut camera = CameraState::orthographic(-1e6, 1e6, 1e6, -1e6, 0.1, 1e9);
        camera.position = start;
        camera.up = DVec3::Z;
        camera.look_at(DVec3::ZERO);

        let planes = adjuster().adjust(&mut camera);
        let distance = start.length();
        let near = distance - e.max_radius() * 1.25;

        assert_eq!(planes.near, 0.0);
        assert!((planes.far - (e.max_radius() * 1.25 + 0.1)).abs() < 1e-6);
        assert!((camera.position - (start - DVec3::X * near)).length() < 1e-6);
        assert_eq!(camera.projection.near(), 0.0);
    }

    #[test]
    fn test_custom_projection_unchanged() {
        let mut camera = perspective_at(DVec3::X * 1e8);
        camera.projection = CameraProjection::Custom { near: 3.0, far: 4.0 };
        let before = camera;

        let planes = adjuster().adjust(&mut camera);
        assert_eq!(planes, ClipPlanes { near: 3.0, far: 4.0 });
        assert_eq!(camera, before);
    }

    #[test]
    fn test_translated_ellipsoid_frame() {
        let e = Ellipsoid::WGS84;
        let offset = DVec3::new(1e5, -2e5, 3e5);
        let settings = ClipPlaneSettings {
            ellipsoid_frame: DAffine3::from_translation(offset),
            ..ClipPlaneSettings::default()
        };
        let shifted = GlobeClipPlaneAdjuster::new(e, settings).unwrap();

        let position = DVec3::Y * (e.equatorial_radius() + 50_000.0);
        let mut reference = perspective_at(position);
        let mut camera = perspective_at(position + offset);

        let expected = adjuster().adjust(&mut reference);
        let planes = shifted.adjust(&mut camera);
        assert!((planes.near - expected.near).abs() < 1e-6);
        assert!((planes.far - expected.far).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_settings() {
        let e = Ellipsoid::WGS84;
        let bad = [
            ClipPlaneSettings {
                near_margin: -0.1,
                ..ClipPlaneSettings::default()
            },
            ClipPlaneSettings {
                far_margin: f64::NAN,
                ..ClipPlaneSettings::default()
            },
            ClipPlaneSettings {
                min_elevation: f64::INFINITY,
                ..ClipPlaneSettings::default()
            },
            ClipPlaneSettings {
                ellipsoid_frame: DAffine3::from_scale(DVec3::new(1.0, 0.0, 1.0)),
                ..ClipPlaneSettings::default()
            },
        ];
        for settings in bad {
            assert!(GlobeClipPlaneAdjuster::new(e, settings).is_err(), "{settings:?}");
        }
    }
}
