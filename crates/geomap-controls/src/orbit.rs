//! Damped orbit controls around a target on the globe.
//!
//! Input handlers enqueue rotate/pan/dolly deltas; [`OrbitCameraController::update`]
//! integrates them once per frame, moves the camera and reports whether the
//! pose changed. Panning accumulates into a persistent offset that survives
//! every update until [`OrbitCameraController::reset_pan_offset`] is called.
//!
//! The orbit is computed in an auxiliary frame where the configured up vector
//! maps to +Y, using three.js-style spherical coordinates: `theta` is the
//! azimuth around +Y measured from +Z, `phi` the polar angle from +Y.

use std::f64::consts::{PI, TAU};

use glam::{DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraProjection, CameraState, look_rotation};
use crate::ellipsoid::{Ellipsoid, Ray};
use crate::error::{ConfigError, Result, check_range};
use crate::geodetic::LocalFrame;
use crate::point_of_view::PointOfView;

/// Threshold on squared displacement and approximate squared rotation angle
/// below which an update is not considered a change.
pub const CHANGE_EPSILON: f64 = 1e-6;

/// Margin kept between the polar angle and the poles of the orbit sphere.
const POLE_EPSILON: f64 = 1e-6;

/// The externally addressable camera intent.
///
/// `heading`/`pitch`/`distance` place the camera around the target as
/// described in [`PointOfView`]; `x`/`y` shift the target sideways and
/// forward in the plane orthogonal to the controller's up vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraTargetPose {
    /// Heading in radians.
    pub heading: f64,
    /// Pitch in radians; positive looks down.
    pub pitch: f64,
    /// Distance from camera to the panned target in meters.
    pub distance: f64,
    /// Sideways target offset in meters; positive moves the target left.
    #[serde(default)]
    pub x: f64,
    /// Forward target offset in meters.
    #[serde(default)]
    pub y: f64,
}

/// Notifications emitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// An interaction began.
    Start,
    /// The camera moved during the last update.
    Change,
    /// An interaction ended.
    End,
    /// The derived [`CameraTargetPose`] was recomputed.
    TargetChange,
}

/// Kind of user interaction currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Orbiting around the target.
    Rotate,
    /// Moving the target.
    Pan,
    /// Zooming.
    Dolly,
}

/// Strategy switches that change how zoom and panning move the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitBehavior {
    /// Zoom toward the point under the cursor instead of the target.
    pub zoom_to_cursor: bool,
    /// After a cursor zoom, place the target straight ahead of the camera
    /// instead of on the plane through the previous target.
    pub screen_space_panning: bool,
    /// Maximum angle in radians between the view direction and the up axis
    /// for which the target is re-placed on the target plane after a cursor
    /// zoom. Flatter views keep the existing target, since the plane
    /// intersection would run off toward the horizon.
    pub tilt_limit: f64,
}

impl Default for OrbitBehavior {
    fn default() -> Self {
        Self {
            zoom_to_cursor: false,
            screen_space_panning: false,
            tilt_limit: 70f64.to_radians(),
        }
    }
}

/// Configuration of an [`OrbitCameraController`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    /// Up axis of the orbit; usually the surface normal at the target.
    pub up: DVec3,
    /// Smooth deltas over several frames.
    pub enable_damping: bool,
    /// Fraction of the pending delta applied per frame, in `[0, 1)`.
    pub damping_factor: f64,
    /// Minimum camera-to-target distance.
    pub min_distance: f64,
    /// Maximum camera-to-target distance.
    pub max_distance: f64,
    /// Minimum orthographic zoom.
    pub min_zoom: f64,
    /// Maximum orthographic zoom.
    pub max_zoom: f64,
    /// Minimum distance of the pan offset from `cursor`.
    pub min_target_radius: f64,
    /// Maximum distance of the pan offset from `cursor`.
    pub max_target_radius: f64,
    /// Minimum polar angle in radians, measured from the up axis.
    pub min_polar_angle: f64,
    /// Maximum polar angle in radians.
    pub max_polar_angle: f64,
    /// Minimum azimuth in radians; non-finite means unconstrained.
    pub min_azimuth_angle: f64,
    /// Maximum azimuth in radians; non-finite means unconstrained.
    pub max_azimuth_angle: f64,
    /// Rotate around the target while the user is not interacting.
    pub auto_rotate: bool,
    /// Auto-rotation speed; 2.0 is one orbit every 30 seconds.
    pub auto_rotate_speed: f64,
    /// Multiplier for pointer rotation.
    pub rotate_speed: f64,
    /// Multiplier for pointer panning.
    pub pan_speed: f64,
    /// Multiplier for wheel zoom.
    pub zoom_speed: f64,
    /// Allow rotation input.
    pub enable_rotate: bool,
    /// Allow pan input.
    pub enable_pan: bool,
    /// Allow zoom input.
    pub enable_zoom: bool,
    /// Center of the sphere that bounds the pan offset.
    pub cursor: DVec3,
    /// Zoom and target placement strategy.
    pub behavior: OrbitBehavior,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            up: DVec3::Y,
            enable_damping: false,
            damping_factor: 0.05,
            min_distance: 0.0,
            max_distance: f64::INFINITY,
            min_zoom: 0.0,
            max_zoom: f64::INFINITY,
            min_target_radius: 0.0,
            max_target_radius: f64::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            min_azimuth_angle: f64::NEG_INFINITY,
            max_azimuth_angle: f64::INFINITY,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            enable_rotate: true,
            enable_pan: true,
            enable_zoom: true,
            cursor: DVec3::ZERO,
            behavior: OrbitBehavior::default(),
        }
    }
}

impl OrbitSettings {
    /// Check that every limit is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.up.is_finite() || self.up.length_squared() == 0.0 {
            return Err(ConfigError::DegenerateUpVector);
        }
        if !(0.0..1.0).contains(&self.damping_factor) {
            return Err(ConfigError::OutOfRange {
                setting: "damping factor",
                value: self.damping_factor,
                expected: "a value in [0, 1)",
            });
        }

        non_negative("min distance", self.min_distance)?;
        check_range("distance", self.min_distance, self.max_distance)?;
        non_negative("min zoom", self.min_zoom)?;
        check_range("zoom", self.min_zoom, self.max_zoom)?;
        non_negative("min target radius", self.min_target_radius)?;
        check_range("target radius", self.min_target_radius, self.max_target_radius)?;

        if !(0.0..=PI).contains(&self.min_polar_angle) || !(0.0..=PI).contains(&self.max_polar_angle)
        {
            return Err(ConfigError::OutOfRange {
                setting: "polar angle",
                value: if (0.0..=PI).contains(&self.min_polar_angle) {
                    self.max_polar_angle
                } else {
                    self.min_polar_angle
                },
                expected: "a value in [0, π]",
            });
        }
        check_range("polar angle", self.min_polar_angle, self.max_polar_angle)?;

        for (setting, value) in [
            ("rotate speed", self.rotate_speed),
            ("pan speed", self.pan_speed),
            ("zoom speed", self.zoom_speed),
        ] {
            non_negative(setting, value)?;
        }
        if !self.auto_rotate_speed.is_finite() {
            return Err(ConfigError::OutOfRange {
                setting: "auto-rotate speed",
                value: self.auto_rotate_speed,
                expected: "a finite value",
            });
        }
        if !(0.0..=std::f64::consts::FRAC_PI_2).contains(&self.behavior.tilt_limit) {
            return Err(ConfigError::OutOfRange {
                setting: "tilt limit",
                value: self.behavior.tilt_limit,
                expected: "a value in [0, π/2]",
            });
        }
        Ok(())
    }
}

fn non_negative(setting: &'static str, value: f64) -> Result<()> {
    if value.is_nan() || value < 0.0 || value == f64::INFINITY {
        return Err(ConfigError::OutOfRange {
            setting,
            value,
            expected: "a finite non-negative value",
        });
    }
    Ok(())
}

/// Spherical coordinates around +Y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spherical {
    /// Distance from the origin.
    pub radius: f64,
    /// Polar angle from +Y.
    pub phi: f64,
    /// Azimuth around +Y, measured from +Z toward +X.
    pub theta: f64,
}

impl Spherical {
    /// Convert a Cartesian vector to spherical coordinates.
    pub fn from_vec3(v: DVec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    /// Convert back to a Cartesian vector.
    pub fn to_vec3(self) -> DVec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let sin_phi_radius = sin_phi * self.radius;
        DVec3::new(
            sin_phi_radius * sin_theta,
            cos_phi * self.radius,
            sin_phi_radius * cos_theta,
        )
    }

    /// Keep `phi` strictly away from the poles.
    pub fn make_safe(&mut self) {
        self.phi = self.phi.clamp(POLE_EPSILON, PI - POLE_EPSILON);
    }
}

/// Clamp an azimuth to `[min, max]`.
///
/// Limits are first wrapped into `[-π, π]`. When `min > max` the allowed
/// range wraps through ±π and an out-of-range angle snaps to whichever bound
/// is closer. Non-finite limits leave the angle unconstrained.
pub fn clamp_azimuth(theta: f64, min: f64, max: f64) -> f64 {
    if !min.is_finite() || !max.is_finite() {
        return theta;
    }

    let wrap = |angle: f64| {
        if angle < -PI {
            angle + TAU
        } else if angle > PI {
            angle - TAU
        } else {
            angle
        }
    };
    let (min, max) = (wrap(min), wrap(max));

    if min <= max {
        theta.clamp(min, max)
    } else if theta > (min + max) / 2.0 {
        theta.max(min)
    } else {
        theta.min(max)
    }
}

/// Scale `v` so its length lies within `[min, max]`; zero vectors stay zero.
fn clamp_length(v: DVec3, min: f64, max: f64) -> DVec3 {
    let length = v.length();
    if length == 0.0 {
        return v;
    }
    v * (length.clamp(min, max) / length)
}

/// Per-frame integration state owned by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitState {
    /// Pending azimuth/polar increments.
    pub spherical_delta: Spherical,
    /// Pending zoom factor; 1 means no zoom.
    pub scale: f64,
    /// Pending pan translation.
    pub pan_offset: DVec3,
    /// Accumulated pan translation applied to the target.
    pub persistent_pan_offset: DVec3,
    /// A cursor zoom was requested since the last update.
    pub perform_cursor_zoom: bool,
    /// Direction of the cursor ray for perspective cursor zoom.
    pub dolly_direction: DVec3,
    /// Cursor position in normalized device coordinates.
    pub cursor_ndc: DVec2,
    /// Camera position after the last reported change.
    pub last_position: DVec3,
    /// Camera orientation after the last reported change.
    pub last_orientation: DQuat,
    /// Target after the last reported change.
    pub last_target: DVec3,
    /// Interaction in progress, if any.
    pub interaction: Option<Interaction>,
}

impl Default for OrbitState {
    fn default() -> Self {
        Self {
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: DVec3::ZERO,
            persistent_pan_offset: DVec3::ZERO,
            perform_cursor_zoom: false,
            dolly_direction: DVec3::ZERO,
            cursor_ndc: DVec2::ZERO,
            last_position: DVec3::ZERO,
            last_orientation: DQuat::IDENTITY,
            last_target: DVec3::ZERO,
            interaction: None,
        }
    }
}

/// Orbit camera controller for a single camera.
#[derive(Debug, Clone)]
pub struct OrbitCameraController {
    ellipsoid: Ellipsoid,
    settings: OrbitSettings,
    state: OrbitState,
    /// Orbit target before the persistent pan offset is applied.
    target: DVec3,
    target_pose: CameraTargetPose,
    /// Rotation taking `settings.up` to +Y.
    up_to_y: DQuat,
    events: Vec<ControlEvent>,
}

impl OrbitCameraController {
    /// Create a controller, rejecting unusable settings.
    pub fn new(ellipsoid: Ellipsoid, mut settings: OrbitSettings) -> Result<Self> {
        settings.validate()?;
        settings.up = settings.up.normalize();

        Ok(Self {
            ellipsoid,
            up_to_y: DQuat::from_rotation_arc(settings.up, DVec3::Y),
            settings,
            state: OrbitState::default(),
            target: DVec3::ZERO,
            target_pose: CameraTargetPose::default(),
            events: Vec::new(),
        })
    }

    /// The ellipsoid the controller navigates around.
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Current settings.
    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    /// Replace the settings after validating them.
    ///
    /// The up vector is not changed here; use [`Self::set_up`].
    pub fn set_settings(&mut self, settings: OrbitSettings) -> Result<()> {
        settings.validate()?;
        let up = self.settings.up;
        self.settings = OrbitSettings { up, ..settings };
        Ok(())
    }

    /// Enable or disable auto-rotation.
    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.settings.auto_rotate = enabled;
    }

    /// Enable or disable damping.
    pub fn set_damping(&mut self, enabled: bool) {
        self.settings.enable_damping = enabled;
    }

    /// Enable or disable zooming toward the cursor.
    pub fn set_zoom_to_cursor(&mut self, enabled: bool) {
        self.settings.behavior.zoom_to_cursor = enabled;
    }

    /// Integration state, for inspection.
    pub fn state(&self) -> &OrbitState {
        &self.state
    }

    /// The orbit target including the persistent pan offset.
    pub fn target(&self) -> DVec3 {
        self.target + self.state.persistent_pan_offset
    }

    /// The orbit target without the persistent pan offset.
    pub fn raw_target(&self) -> DVec3 {
        self.target
    }

    /// Move the raw orbit target.
    pub fn set_target(&mut self, target: DVec3) {
        self.target = target;
    }

    /// Accumulated pan offset.
    pub fn persistent_pan_offset(&self) -> DVec3 {
        self.state.persistent_pan_offset
    }

    /// Clear the persistent pan offset.
    pub fn reset_pan_offset(&mut self) {
        self.state.persistent_pan_offset = DVec3::ZERO;
    }

    /// The most recent camera intent, as set or as derived after a change.
    pub fn target_pose(&self) -> CameraTargetPose {
        self.target_pose
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, ControlEvent> {
        self.events.drain(..)
    }

    /// Change the orbit's up axis and re-apply the current target pose.
    pub fn set_up(&mut self, camera: &mut CameraState, up: DVec3) -> Result<()> {
        if !up.is_finite() || up.length_squared() == 0.0 {
            return Err(ConfigError::DegenerateUpVector);
        }
        let up = up.normalize();
        tracing::debug!("Orbit up axis set to ({:.6}, {:.6}, {:.6})", up.x, up.y, up.z);

        self.settings.up = up;
        self.up_to_y = DQuat::from_rotation_arc(up, DVec3::Y);
        camera.up = up;
        self.set_camera_position(camera, self.target_pose);
        Ok(())
    }

    /// Place the camera according to `pose` and make it the current intent.
    pub fn set_camera_position(&mut self, camera: &mut CameraState, pose: CameraTargetPose) {
        self.target_pose = pose;

        let pov = PointOfView::new(pose.distance, pose.heading, pose.pitch);
        let frame = LocalFrame::at(&self.ellipsoid, self.target);
        let direction = pov.look_direction(&frame);

        // Panning translates camera and target together, so the orientation
        // can be computed around the raw target before the offset is known.
        let orientation = look_rotation(
            self.target - direction * pose.distance,
            self.target,
            camera.up,
        );
        let right = orientation * DVec3::X;
        self.state.persistent_pan_offset = self.pan_offset_for(right, pose.x, pose.y);

        camera.position = self.target() - direction * pose.distance;
        camera.orientation = orientation;

        self.state.last_position = camera.position;
        self.state.last_orientation = camera.orientation;
        self.state.last_target = self.target();
    }

    /// Derive the camera intent from the camera's current transform.
    pub fn invert_camera_hpd(&self, camera: &CameraState) -> CameraTargetPose {
        let target = self.target();
        let frame = LocalFrame::at(&self.ellipsoid, self.target);
        let pov = PointOfView::compose_in_frame(&frame, target, camera.position);

        let (x, y) = if self.state.persistent_pan_offset.length_squared() > 0.0 {
            let right = camera.right();
            let offset = self.state.persistent_pan_offset;
            (
                -offset.dot(self.sideways_axis(right)),
                offset.dot(self.forward_axis(right)),
            )
        } else {
            (0.0, 0.0)
        };

        CameraTargetPose {
            heading: pov.heading,
            pitch: pov.pitch,
            distance: pov.distance,
            x,
            y,
        }
    }

    /// Camera right vector projected onto the plane orthogonal to up.
    fn sideways_axis(&self, right: DVec3) -> DVec3 {
        let up = self.settings.up;
        (right - up * right.dot(up)).normalize_or_zero()
    }

    /// Horizontal direction perpendicular to the camera right vector.
    fn forward_axis(&self, right: DVec3) -> DVec3 {
        self.settings.up.cross(right).normalize_or_zero()
    }

    fn pan_offset_for(&self, right: DVec3, x: f64, y: f64) -> DVec3 {
        let mut offset = DVec3::ZERO;
        if x != 0.0 {
            offset += self.sideways_axis(right) * -x;
        }
        if y != 0.0 {
            offset += self.forward_axis(right) * y;
        }
        offset
    }

    /// Mark the start of an interaction, emitting [`ControlEvent::Start`].
    pub fn begin_interaction(&mut self, interaction: Interaction) {
        if self.state.interaction.is_none() {
            self.events.push(ControlEvent::Start);
        }
        self.state.interaction = Some(interaction);
    }

    /// Mark the end of the current interaction, emitting [`ControlEvent::End`].
    pub fn end_interaction(&mut self) {
        if self.state.interaction.take().is_some() {
            self.events.push(ControlEvent::End);
        }
    }

    /// Orbit around the up axis by `angle` radians.
    pub fn rotate_left(&mut self, angle: f64) {
        self.state.spherical_delta.theta -= angle;
    }

    /// Tilt the orbit by `angle` radians.
    pub fn rotate_up(&mut self, angle: f64) {
        self.state.spherical_delta.phi -= angle;
    }

    /// Rotate from a pointer movement of `delta` pixels in a viewport of
    /// `viewport` pixels.
    pub fn rotate(&mut self, delta: DVec2, viewport: DVec2) {
        if !self.settings.enable_rotate || viewport.y <= 0.0 {
            return;
        }
        let delta = delta * self.settings.rotate_speed;
        self.rotate_left(TAU * delta.x / viewport.y);
        self.rotate_up(TAU * delta.y / viewport.y);
    }

    /// Move the target left by `distance` meters.
    pub fn pan_left(&mut self, distance: f64, camera: &CameraState) {
        self.state.pan_offset += self.sideways_axis(camera.right()) * -distance;
    }

    /// Move the target forward by `distance` meters.
    pub fn pan_up(&mut self, distance: f64, camera: &CameraState) {
        self.state.pan_offset += self.forward_axis(camera.right()) * distance;
    }

    /// Pan from a pointer movement of `delta` pixels in a viewport of
    /// `viewport` pixels, so that the ground follows the pointer.
    pub fn pan(&mut self, delta: DVec2, viewport: DVec2, camera: &CameraState) {
        if !self.settings.enable_pan || viewport.x <= 0.0 || viewport.y <= 0.0 {
            return;
        }
        let delta = delta * self.settings.pan_speed;

        match camera.projection {
            CameraProjection::Perspective { fov, .. } => {
                let target_distance =
                    (camera.position - self.target()).length() * (fov * 0.5).tan();
                self.pan_left(2.0 * delta.x * target_distance / viewport.y, camera);
                self.pan_up(2.0 * delta.y * target_distance / viewport.y, camera);
            }
            CameraProjection::Orthographic {
                left,
                right,
                top,
                bottom,
                zoom,
                ..
            } => {
                self.pan_left(delta.x * (right - left) / zoom / viewport.x, camera);
                self.pan_up(delta.y * (top - bottom) / zoom / viewport.y, camera);
            }
            CameraProjection::Custom { .. } => {
                tracing::warn!("Unknown camera projection, panning disabled");
                self.settings.enable_pan = false;
            }
        }
    }

    /// Zoom factor for a wheel movement of `delta`.
    pub fn zoom_scale(&self, delta: f64) -> f64 {
        0.95f64.powf(self.settings.zoom_speed * (delta * 0.01).abs())
    }

    /// Move closer by `scale` (a value below 1).
    pub fn dolly_in(&mut self, scale: f64) {
        if self.settings.enable_zoom && scale > 0.0 {
            self.state.scale *= scale;
        }
    }

    /// Move away by `scale` (a value below 1).
    pub fn dolly_out(&mut self, scale: f64) {
        if self.settings.enable_zoom && scale > 0.0 {
            self.state.scale /= scale;
        }
    }

    /// Record the cursor for zoom-to-cursor.
    ///
    /// Does nothing unless zoom-to-cursor is enabled.
    pub fn set_cursor(&mut self, ndc: DVec2, camera: &CameraState) {
        if !self.settings.behavior.zoom_to_cursor {
            return;
        }
        self.state.perform_cursor_zoom = true;
        self.state.cursor_ndc = ndc;
        self.state.dolly_direction = camera.view_ray(ndc).direction.normalize_or_zero();
    }

    /// Handle a wheel movement at the cursor position `ndc`.
    pub fn zoom_wheel(&mut self, delta: f64, ndc: DVec2, camera: &CameraState) {
        if !self.settings.enable_zoom {
            return;
        }
        self.events.push(ControlEvent::Start);
        self.set_cursor(ndc, camera);
        if delta < 0.0 {
            self.dolly_in(self.zoom_scale(delta));
        } else if delta > 0.0 {
            self.dolly_out(self.zoom_scale(delta));
        }
        self.events.push(ControlEvent::End);
    }

    fn auto_rotation_angle(&self, delta_time: Option<f64>) -> f64 {
        let speed = self.settings.auto_rotate_speed;
        match delta_time {
            Some(dt) => TAU / 60.0 * speed * dt,
            None => TAU / 60.0 / 60.0 * speed,
        }
    }

    fn clamp_distance(&self, distance: f64) -> f64 {
        distance.clamp(self.settings.min_distance, self.settings.max_distance)
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.settings.min_zoom, self.settings.max_zoom)
    }

    /// Integrate pending input and move the camera.
    ///
    /// `delta_time` is the frame time in seconds, used for auto-rotation.
    /// Returns `true` when the camera or target moved by more than
    /// [`CHANGE_EPSILON`] or the zoom changed; in that case
    /// [`ControlEvent::Change`] and [`ControlEvent::TargetChange`] are queued
    /// and the target pose is recomputed.
    pub fn update(&mut self, camera: &mut CameraState, delta_time: Option<f64>) -> bool {
        let mut target = self.target();
        let offset = self.up_to_y * (camera.position - target);
        let mut spherical = Spherical::from_vec3(offset);

        if self.settings.auto_rotate && self.state.interaction.is_none() {
            self.rotate_left(self.auto_rotation_angle(delta_time));
        }

        let factor = if self.settings.enable_damping {
            self.settings.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.state.spherical_delta.theta * factor;
        spherical.phi += self.state.spherical_delta.phi * factor;

        spherical.theta = clamp_azimuth(
            spherical.theta,
            self.settings.min_azimuth_angle,
            self.settings.max_azimuth_angle,
        );
        spherical.phi = spherical
            .phi
            .clamp(self.settings.min_polar_angle, self.settings.max_polar_angle);
        spherical.make_safe();

        // Move the target to the panned location, bounded around the cursor.
        let cursor = self.settings.cursor;
        let panned = self.state.persistent_pan_offset + self.state.pan_offset * factor;
        self.state.persistent_pan_offset = cursor
            + clamp_length(
                panned - cursor,
                self.settings.min_target_radius,
                self.settings.max_target_radius,
            );
        target = self.target();

        let mut cursor_zoom = self.settings.behavior.zoom_to_cursor && self.state.perform_cursor_zoom;
        if cursor_zoom && matches!(camera.projection, CameraProjection::Custom { .. }) {
            tracing::warn!("Unknown camera projection, zoom to cursor disabled");
            self.settings.behavior.zoom_to_cursor = false;
            cursor_zoom = false;
        }
        let orthographic = matches!(camera.projection, CameraProjection::Orthographic { .. });

        // Cursor zoom and orthographic zoom are applied after the orbit.
        let mut zoom_changed = false;
        if cursor_zoom || orthographic {
            spherical.radius = self.clamp_distance(spherical.radius);
        } else {
            let previous = spherical.radius;
            spherical.radius = self.clamp_distance(previous * self.state.scale);
            zoom_changed = previous != spherical.radius;
        }

        let offset = self.up_to_y.inverse() * spherical.to_vec3();
        camera.position = target + offset;
        camera.look_at(target);

        if self.settings.enable_damping {
            let decay = 1.0 - self.settings.damping_factor;
            self.state.spherical_delta.theta *= decay;
            self.state.spherical_delta.phi *= decay;
            self.state.pan_offset *= decay;
        } else {
            self.state.spherical_delta = Spherical::default();
            self.state.pan_offset = DVec3::ZERO;
        }

        if cursor_zoom {
            if let Some((new_radius, changed)) = self.zoom_to_cursor(camera, offset.length()) {
                zoom_changed |= changed;
                self.place_target_after_cursor_zoom(camera, target, new_radius);
            }
        } else if let CameraProjection::Orthographic { zoom, .. } = &mut camera.projection {
            let previous = *zoom;
            *zoom = (previous / self.state.scale).clamp(self.settings.min_zoom, self.settings.max_zoom);
            zoom_changed |= previous != *zoom;
        }

        self.state.scale = 1.0;
        self.state.perform_cursor_zoom = false;

        // Small-angle approximation: cos(θ/2) ≈ 1 - θ²/8.
        let rotation = 8.0 * (1.0 - self.state.last_orientation.dot(camera.orientation).abs());
        let changed = zoom_changed
            || self.state.last_position.distance_squared(camera.position) > CHANGE_EPSILON
            || rotation > CHANGE_EPSILON
            || self.state.last_target.distance_squared(self.target()) > CHANGE_EPSILON;

        if changed {
            self.events.push(ControlEvent::Change);
            self.state.last_position = camera.position;
            self.state.last_orientation = camera.orientation;
            self.state.last_target = self.target();
            self.target_pose = self.invert_camera_hpd(camera);
            self.events.push(ControlEvent::TargetChange);
        }

        changed
    }

    /// Apply the pending zoom around the cursor.
    ///
    /// Returns the new orbit radius and whether the zoom changed.
    fn zoom_to_cursor(&self, camera: &mut CameraState, radius: f64) -> Option<(f64, bool)> {
        match camera.projection {
            CameraProjection::Perspective { .. } => {
                // Moving along the cursor ray avoids accumulating error in the
                // orbit radius.
                let new_radius = self.clamp_distance(radius * self.state.scale);
                let radius_delta = radius - new_radius;
                camera.position += self.state.dolly_direction * radius_delta;
                Some((new_radius, radius_delta != 0.0))
            }
            CameraProjection::Orthographic { zoom, .. } => {
                let ndc = self.state.cursor_ndc;
                let before = camera.orthographic_point(ndc)?;

                let new_zoom = self.clamp_zoom(zoom / self.state.scale);
                if let CameraProjection::Orthographic { zoom, .. } = &mut camera.projection {
                    *zoom = new_zoom;
                }

                let after = camera.orthographic_point(ndc)?;
                camera.position += before - after;
                Some((radius, new_zoom != zoom))
            }
            CameraProjection::Custom { .. } => None,
        }
    }

    /// Re-place the orbit target after a cursor zoom moved the camera.
    fn place_target_after_cursor_zoom(&mut self, camera: &mut CameraState, target: DVec3, radius: f64) {
        let offset = self.state.persistent_pan_offset;

        if self.settings.behavior.screen_space_panning {
            self.target = camera.position + camera.forward() * radius - offset;
            return;
        }

        let ray = Ray::new(camera.position, camera.forward());
        if camera.up.dot(ray.direction).abs() < self.settings.behavior.tilt_limit.cos() {
            camera.look_at(target);
        } else if let Some(hit) = ray.intersect_plane(camera.up, target) {
            self.target = hit - offset;
        }
    }
}
