//! Host camera model.
//!
//! The controller never owns the renderer's camera. Hosts copy their camera
//! into a [`CameraState`] (or keep one alongside it), let the controller and
//! clip-plane adjuster mutate it, and copy the result back.
//!
//! Cameras look down their local -Z axis with +Y up and +X to the right.

use glam::{DAffine3, DMat3, DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::ellipsoid::Ray;

/// Projection parameters of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraProjection {
    /// Perspective projection.
    Perspective {
        /// Vertical field of view in radians.
        fov: f64,
        /// Width divided by height.
        aspect: f64,
        /// Near clip distance.
        near: f64,
        /// Far clip distance.
        far: f64,
    },
    /// Orthographic projection with three.js-style zoom.
    Orthographic {
        /// Left extent of the view volume at zoom 1.
        left: f64,
        /// Right extent of the view volume at zoom 1.
        right: f64,
        /// Top extent of the view volume at zoom 1.
        top: f64,
        /// Bottom extent of the view volume at zoom 1.
        bottom: f64,
        /// Zoom factor; extents are divided by it.
        zoom: f64,
        /// Near clip distance.
        near: f64,
        /// Far clip distance.
        far: f64,
    },
    /// A projection the controller does not understand.
    ///
    /// Orbiting and target-anchored zoom still work; cursor zoom and panning
    /// are disabled when used with this projection.
    Custom {
        /// Near clip distance.
        near: f64,
        /// Far clip distance.
        far: f64,
    },
}

impl CameraProjection {
    /// Near clip distance.
    pub fn near(&self) -> f64 {
        match *self {
            Self::Perspective { near, .. }
            | Self::Orthographic { near, .. }
            | Self::Custom { near, .. } => near,
        }
    }

    /// Far clip distance.
    pub fn far(&self) -> f64 {
        match *self {
            Self::Perspective { far, .. }
            | Self::Orthographic { far, .. }
            | Self::Custom { far, .. } => far,
        }
    }

    /// Replace the near and far clip distances.
    pub fn set_clip_planes(&mut self, new_near: f64, new_far: f64) {
        match self {
            Self::Perspective { near, far, .. }
            | Self::Orthographic { near, far, .. }
            | Self::Custom { near, far } => {
                *near = new_near;
                *far = new_far;
            }
        }
    }

    /// Orthographic zoom, if this is an orthographic projection.
    pub fn zoom(&self) -> Option<f64> {
        match *self {
            Self::Orthographic { zoom, .. } => Some(zoom),
            _ => None,
        }
    }

    /// Update the width/height ratio of the view.
    ///
    /// Orthographic projections keep their vertical extent and are resized
    /// horizontally around their center. Non-positive ratios are ignored.
    pub fn set_aspect(&mut self, new_aspect: f64) {
        if !new_aspect.is_finite() || new_aspect <= 0.0 {
            return;
        }
        match self {
            Self::Perspective { aspect, .. } => *aspect = new_aspect,
            Self::Orthographic {
                left,
                right,
                top,
                bottom,
                ..
            } => {
                let center = (*left + *right) * 0.5;
                let half_width = (*top - *bottom) * 0.5 * new_aspect;
                *left = center - half_width;
                *right = center + half_width;
            }
            Self::Custom { .. } => {}
        }
    }
}

/// Position, orientation and projection of a camera in ECEF space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    /// Camera position.
    pub position: DVec3,
    /// Rotation from camera-local to world space.
    pub orientation: DQuat,
    /// Up hint used by [`CameraState::look_at`].
    pub up: DVec3,
    /// Projection parameters.
    pub projection: CameraProjection,
}

impl CameraState {
    /// Perspective camera at the origin looking down -Z.
    pub fn perspective(fov: f64, aspect: f64, near: f64, far: f64) -> Self {
        Self {
            position: DVec3::ZERO,
            orientation: DQuat::IDENTITY,
            up: DVec3::Y,
            projection: CameraProjection::Perspective {
                fov,
                aspect,
                near,
                far,
            },
        }
    }

    /// Orthographic camera at the origin looking down -Z.
    pub fn orthographic(left: f64, right: f64, top: f64, bottom: f64, near: f64, far: f64) -> Self {
        Self {
            position: DVec3::ZERO,
            orientation: DQuat::IDENTITY,
            up: DVec3::Y,
            projection: CameraProjection::Orthographic {
                left,
                right,
                top,
                bottom,
                zoom: 1.0,
                near,
                far,
            },
        }
    }

    /// Direction the camera looks in.
    pub fn forward(&self) -> DVec3 {
        self.orientation * DVec3::NEG_Z
    }

    /// Camera-local +X in world space.
    pub fn right(&self) -> DVec3 {
        self.orientation * DVec3::X
    }

    /// Camera-local +Y in world space.
    pub fn local_up(&self) -> DVec3 {
        self.orientation * DVec3::Y
    }

    /// Camera-to-world transform.
    ///
    /// ```
    /// use geomap_controls::CameraState;
    /// use glam::DVec3;
    ///
    /// let mut camera = CameraState::perspective(0.8, 1.5, 1.0, 1e9);
    /// camera.position = DVec3::new(0.0, 0.0, 10.0);
    /// let world = camera.transform().transform_point3(DVec3::NEG_Z);
    /// assert!((world - DVec3::new(0.0, 0.0, 9.0)).length() < 1e-12);
    /// assert!((camera.transform().transform_vector3(DVec3::Y) - camera.local_up()).length() < 1e-12);
    /// ```
    pub fn transform(&self) -> DAffine3 {
        DAffine3::from_rotation_translation(self.orientation, self.position)
    }

    /// Transform a world-space point into camera-local space.
    pub fn world_to_local(&self, point: DVec3) -> DVec3 {
        self.orientation.inverse() * (point - self.position)
    }

    /// Rotate the camera so it looks at `target`, keeping `self.up` as the
    /// up hint.
    pub fn look_at(&mut self, target: DVec3) {
        self.orientation = look_rotation(self.position, target, self.up);
    }

    /// Ray from the camera through a point in normalized device coordinates.
    ///
    /// For perspective projections the ray starts at the camera position; for
    /// orthographic projections it starts on the camera plane and runs along
    /// the forward axis. Custom projections yield the forward ray.
    pub fn view_ray(&self, ndc: DVec2) -> Ray {
        match self.projection {
            CameraProjection::Perspective { fov, aspect, .. } => {
                let half_height = (fov * 0.5).tan();
                let local = DVec3::new(ndc.x * half_height * aspect, ndc.y * half_height, -1.0);
                Ray::new(self.position, (self.orientation * local).normalize())
            }
            CameraProjection::Orthographic { .. } => Ray::new(
                self.orthographic_point(ndc).unwrap_or(self.position),
                self.forward(),
            ),
            CameraProjection::Custom { .. } => Ray::new(self.position, self.forward()),
        }
    }

    /// World-space point on the camera plane under an NDC coordinate.
    ///
    /// Only defined for orthographic projections.
    pub fn orthographic_point(&self, ndc: DVec2) -> Option<DVec3> {
        let CameraProjection::Orthographic {
            left,
            right,
            top,
            bottom,
            zoom,
            ..
        } = self.projection
        else {
            return None;
        };

        let half_width = (right - left) / (2.0 * zoom);
        let half_height = (top - bottom) / (2.0 * zoom);
        let center_x = (right + left) * 0.5;
        let center_y = (top + bottom) * 0.5;

        let local = DVec3::new(
            center_x + ndc.x * half_width,
            center_y + ndc.y * half_height,
            0.0,
        );
        Some(self.position + self.orientation * local)
    }
}

/// Rotation for a camera at `eye` looking at `target` with the given up hint.
///
/// When the view direction is parallel to `up`, the direction is nudged
/// slightly so a valid basis can still be built.
pub fn look_rotation(eye: DVec3, target: DVec3, up: DVec3) -> DQuat {
    let mut z = eye - target;
    if z.length_squared() == 0.0 {
        z = DVec3::Z;
    }
    z = z.normalize();

    let mut x = up.cross(z);
    if x.length_squared() < 1e-20 {
        if (up.z.abs() - 1.0).abs() < f64::EPSILON {
            z.x += 1e-4;
        } else {
            z.z += 1e-4;
        }
        z = z.normalize();
        x = up.cross(z);
    }
    let x = x.normalize_or(DVec3::X);
    let y = z.cross(x);

    DQuat::from_mat3(&DMat3::from_cols(x, y, z)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_at_points_forward_at_target() {
        let mut camera = CameraState::perspective(1.0, 1.5, 1.0, 1000.0);
        camera.position = DVec3::new(10.0, 5.0, -3.0);
        let target = DVec3::new(-2.0, 1.0, 4.0);
        camera.look_at(target);

        let expected = (target - camera.position).normalize();
        assert!((camera.forward() - expected).length() < 1e-12);

        // Right is perpendicular to the up hint.
        assert!(camera.right().dot(camera.up).abs() < 1e-12);
        // Camera up leans toward the up hint.
        assert!(camera.local_up().dot(camera.up) > 0.0);
    }

    #[test]
    fn test_look_at_parallel_to_up() {
        let mut camera = CameraState::perspective(1.0, 1.0, 1.0, 100.0);
        camera.position = DVec3::new(0.0, 10.0, 0.0);
        camera.look_at(DVec3::ZERO);

        assert!(camera.orientation.is_finite());
        assert!((camera.forward() - DVec3::NEG_Y).length() < 1e-3);
    }

    #[test]
    fn test_perspective_view_ray_center_is_forward() {
        let mut camera = CameraState::perspective(0.8, 1.6, 1.0, 1000.0);
        camera.position = DVec3::new(1.0, 2.0, 3.0);
        camera.look_at(DVec3::new(1.0, 2.0, -10.0));

        let ray = camera.view_ray(DVec2::ZERO);
        assert_eq!(ray.origin, camera.position);
        assert!((ray.direction - camera.forward()).length() < 1e-12);

        // Top edge of the screen is half the field of view above forward.
        let top = camera.view_ray(DVec2::new(0.0, 1.0));
        assert!((top.direction.angle_between(camera.forward()) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_orthographic_point_respects_zoom() {
        let mut camera = CameraState::orthographic(-10.0, 10.0, 5.0, -5.0, 0.1, 100.0);
        let corner = camera.orthographic_point(DVec2::new(1.0, 1.0)).unwrap();
        assert!((corner - DVec3::new(10.0, 5.0, 0.0)).length() < 1e-12);

        if let CameraProjection::Orthographic { zoom, .. } = &mut camera.projection {
            *zoom = 2.0;
        }
        let corner = camera.orthographic_point(DVec2::new(1.0, 1.0)).unwrap();
        assert!((corner - DVec3::new(5.0, 2.5, 0.0)).length() < 1e-12);

        let perspective = CameraState::perspective(1.0, 1.0, 1.0, 10.0);
        assert!(perspective.orthographic_point(DVec2::ZERO).is_none());
    }

    #[test]
    fn test_clip_plane_accessors() {
        let mut projection = CameraProjection::Custom {
            near: 1.0,
            far: 2.0,
        };
        projection.set_clip_planes(3.0, 4.0);
        assert_eq!(projection.near(), 3.0);
        assert_eq!(projection.far(), 4.0);
        assert_eq!(projection.zoom(), None);
    }

    #[test]
    fn test_set_aspect() {
        let mut perspective = CameraState::perspective(1.0, 1.0, 1.0, 10.0).projection;
        perspective.set_aspect(2.0);
        assert!(matches!(perspective, CameraProjection::Perspective { aspect, .. } if aspect == 2.0));
        perspective.set_aspect(0.0);
        assert!(matches!(perspective, CameraProjection::Perspective { aspect, .. } if aspect == 2.0));

        let mut orthographic = CameraState::orthographic(-1.0, 3.0, 2.0, -2.0, 0.1, 10.0).projection;
        orthographic.set_aspect(0.5);
        let CameraProjection::Orthographic { left, right, .. } = orthographic else {
            panic!("projection kind changed");
        };
        assert_eq!((left, right), (0.0, 2.0));
    }

    #[test]
    fn test_world_to_local_inverts_transform() {
        let mut camera = CameraState::perspective(1.0, 1.0, 1.0, 10.0);
        camera.position = DVec3::new(100.0, -50.0, 20.0);
        camera.look_at(DVec3::new(0.0, 0.0, 0.0));

        let point = DVec3::new(3.0, 7.0, -11.0);
        let local = camera.world_to_local(point);
        let back = camera.transform().transform_point3(local);
        assert!((back - point).length() < 1e-9);
    }
}
