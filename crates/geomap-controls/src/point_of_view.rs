//! Camera placement relative to a geodetic target.
//!
//! A [`PointOfView`] describes where a camera sits relative to the point it
//! looks at, in the target's local east/north/up frame:
//!
//! - `heading` rotates the horizontal look direction from east toward north
//!   (`east·cos(heading) + north·sin(heading)`),
//! - `pitch` tilts that direction below the horizon; positive pitch looks
//!   down on the target,
//! - `distance` is the straight-line distance from camera to target.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraState, look_rotation};
use crate::ellipsoid::{Ellipsoid, Ray};
use crate::geodetic::{Geodetic, LocalFrame};

/// Distance, heading and pitch of a camera relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointOfView {
    /// Distance from camera to target in meters.
    pub distance: f64,
    /// Heading in radians.
    pub heading: f64,
    /// Pitch in radians; positive looks down.
    pub pitch: f64,
}

/// A camera placement produced by [`PointOfView::decompose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Camera position in ECEF.
    pub position: DVec3,
    /// Camera orientation looking at the target.
    pub orientation: DQuat,
    /// Surface normal at the target, used as the camera's up hint.
    pub up: DVec3,
}

impl PointOfView {
    /// Create a new point of view.
    pub fn new(distance: f64, heading: f64, pitch: f64) -> Self {
        Self {
            distance,
            heading,
            pitch,
        }
    }

    /// Unit vector from the camera toward the target in the given frame.
    pub fn look_direction(&self, frame: &LocalFrame) -> DVec3 {
        let (sin_heading, cos_heading) = self.heading.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let horizontal = frame.east * cos_heading + frame.north * sin_heading;
        (horizontal * cos_pitch - frame.up * sin_pitch).normalize_or(frame.east)
    }

    /// Place a camera so that it looks at `target` from this point of view.
    pub fn decompose(&self, ellipsoid: &Ellipsoid, target: DVec3) -> CameraPose {
        let frame = LocalFrame::at(ellipsoid, target);
        let position = target - self.look_direction(&frame) * self.distance;
        CameraPose {
            position,
            orientation: look_rotation(position, target, frame.up),
            up: frame.up,
        }
    }

    /// Recover the point of view of a camera at `position` looking at `target`.
    ///
    /// This is the inverse of [`PointOfView::decompose`]. Heading is
    /// undefined when looking straight down and is reported as zero.
    pub fn compose(ellipsoid: &Ellipsoid, target: DVec3, position: DVec3) -> Self {
        Self::compose_in_frame(&LocalFrame::at(ellipsoid, target), target, position)
    }

    /// Like [`PointOfView::compose`], measuring angles in an explicit frame.
    pub fn compose_in_frame(frame: &LocalFrame, target: DVec3, position: DVec3) -> Self {
        let offset = target - position;
        let distance = offset.length();
        if distance == 0.0 {
            return Self::default();
        }

        let direction = offset / distance;
        let horizontal = (direction - frame.up * direction.dot(frame.up)).normalize_or_zero();

        Self {
            distance,
            heading: horizontal.dot(frame.north).atan2(horizontal.dot(frame.east)),
            pitch: (-direction.dot(frame.up)).clamp(-1.0, 1.0).asin(),
        }
    }

    /// Point of view of a camera relative to where its forward ray meets the
    /// ellipsoid.
    ///
    /// Returns the point of view and the intersection point, or `None` when
    /// the camera is not looking at the ellipsoid.
    pub fn from_camera(ellipsoid: &Ellipsoid, camera: &CameraState) -> Option<(Self, DVec3)> {
        let ray = Ray::new(camera.position, camera.forward());
        let target = ellipsoid.intersection(&ray)?;
        Some((Self::compose(ellipsoid, target, camera.position), target))
    }
}

/// Move a camera so it views the surface point `target` from `pov`.
pub fn move_to(ellipsoid: &Ellipsoid, camera: &mut CameraState, pov: &PointOfView, target: &Geodetic) {
    let pose = pov.decompose(ellipsoid, target.to_ecef(ellipsoid));
    camera.position = pose.position;
    camera.orientation = pose.orientation;
    camera.up = pose.up;
}

/// What a camera is looking at, in geodetic terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticView {
    /// Distance from the camera to the viewed surface point.
    pub distance: f64,
    /// Heading in radians.
    pub heading: f64,
    /// Pitch in radians.
    pub pitch: f64,
    /// Longitude of the viewed point in radians.
    pub longitude: f64,
    /// Latitude of the viewed point in radians.
    pub latitude: f64,
}

/// Describe the surface point at the center of the camera's view.
///
/// Returns `None` when the view ray misses the ellipsoid.
pub fn camera_geodetic_view(ellipsoid: &Ellipsoid, camera: &CameraState) -> Option<GeodeticView> {
    let (pov, target) = PointOfView::from_camera(ellipsoid, camera)?;
    let geodetic = Geodetic::from_ecef(ellipsoid, target);
    Some(GeodeticView {
        distance: pov.distance,
        heading: pov.heading,
        pitch: pov.pitch,
        longitude: geodetic.longitude,
        latitude: geodetic.latitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodetic::wrap_longitude;
    use proptest::prelude::*;

    #[test]
    fn test_decompose_equator_heading_zero() {
        let e = Ellipsoid::WGS84;
        let target = Geodetic::new(0.0, 0.0, 0.0).to_ecef(&e);
        let pose = PointOfView::new(10_000_000.0, 0.0, 0.0).decompose(&e, target);

        // Looking east from the west: camera sits at target - east * distance.
        let expected = DVec3::new(e.equatorial_radius(), -10_000_000.0, 0.0);
        assert!((pose.position - expected).length() < 1e-6);
        assert!((pose.up - DVec3::X).length() < 1e-12);

        let forward = pose.orientation * DVec3::NEG_Z;
        assert!((forward - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_positive_pitch_looks_down() {
        let e = Ellipsoid::WGS84;
        let target = Geodetic::from_degrees(10.0, 50.0, 0.0).to_ecef(&e);
        let pose = PointOfView::new(1000.0, 0.3, 0.5).decompose(&e, target);

        let frame = LocalFrame::at(&e, target);
        assert!((pose.position - target).dot(frame.up) > 0.0);
        let forward = pose.orientation * DVec3::NEG_Z;
        assert!(forward.dot(frame.up) < 0.0);
    }

    #[test]
    fn test_compose_degenerate() {
        let e = Ellipsoid::WGS84;
        let target = Geodetic::new(0.0, 0.0, 0.0).to_ecef(&e);
        let pov = PointOfView::compose(&e, target, target);
        assert_eq!(pov, PointOfView::default());

        // Straight down: heading undefined, pitch is π/2.
        let above = target + DVec3::X * 500.0;
        let pov = PointOfView::compose(&e, target, above);
        assert!((pov.pitch - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!(pov.heading.is_finite());
    }

    #[test]
    fn test_from_camera_and_geodetic_view() {
        let e = Ellipsoid::WGS84;
        let target = Geodetic::from_degrees(-74.0, 40.7, 0.0);
        let pov = PointOfView::new(25_000.0, 1.0, 0.6);

        let mut camera = CameraState::perspective(0.8, 1.5, 1.0, 1e8);
        move_to(&e, &mut camera, &pov, &target);

        let (recovered, hit) = PointOfView::from_camera(&e, &camera).unwrap();
        assert!((hit - target.to_ecef(&e)).length() < 1e-3);
        assert!((recovered.distance - pov.distance).abs() < 1e-3);
        assert!((recovered.heading - pov.heading).abs() < 1e-6);
        assert!((recovered.pitch - pov.pitch).abs() < 1e-6);

        let view = camera_geodetic_view(&e, &camera).unwrap();
        assert!((view.longitude - target.longitude).abs() < 1e-9);
        assert!((view.latitude - target.latitude).abs() < 1e-9);
        assert!((view.distance - pov.distance).abs() < 1e-3);
    }

    #[test]
    fn test_geodetic_view_looking_at_sky() {
        let e = Ellipsoid::WGS84;
        let target = Geodetic::from_degrees(0.0, 0.0, 0.0);
        let mut camera = CameraState::perspective(0.8, 1.5, 1.0, 1e8);
        move_to(&e, &mut camera, &PointOfView::new(1000.0, 0.0, 0.2), &target);

        // Turn the camera around to face space.
        camera.orientation = look_rotation(camera.position, camera.position * 2.0, camera.up);
        assert!(camera_geodetic_view(&e, &camera).is_none());
    }

    proptest! {
        #[test]
        fn prop_compose_inverts_decompose(
            longitude in -3.1f64..3.1,
            latitude in -1.4f64..1.4,
            distance in 1.0f64..20_000_000.0,
            heading in -3.1f64..3.1,
            pitch in -1.5f64..1.5,
        ) {
            let e = Ellipsoid::WGS84;
            let target = Geodetic::new(longitude, latitude, 0.0).to_ecef(&e);
            let pov = PointOfView::new(distance, heading, pitch);

            let pose = pov.decompose(&e, target);
            let recovered = PointOfView::compose(&e, target, pose.position);

            prop_assert!((recovered.distance - distance).abs() < 1e-6 * distance.max(1.0));
            prop_assert!(wrap_longitude(recovered.heading - heading).abs() < 1e-6);
            prop_assert!((recovered.pitch - pitch).abs() < 1e-6);

            // And back again to the same camera position.
            let again = recovered.decompose(&e, target);
            prop_assert!((again.position - pose.position).length() < 1e-6 * distance.max(1.0));
        }
    }
}
