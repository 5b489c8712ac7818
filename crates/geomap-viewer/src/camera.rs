//! Orbit camera controls for exploring the globe.
//!
//! Left drag orbits around the target, right drag and the arrow keys pan, the
//! wheel zooms (toward the cursor when enabled) and `R` resets the pan offset.
//! The controller works on an f64 [`CameraState`]; the Bevy camera always
//! renders at the origin and the floating origin tracks its ECEF position.

use bevy::camera::ScalingMode;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;
use bevy_egui::input::egui_wants_any_keyboard_input;
use geomap_controls::{
    CameraProjection, CameraState, CameraTargetPose, ClipPlaneSettings, ConfigError, ControlEvent,
    Ellipsoid, Geodetic, GlobeClipPlaneAdjuster, Interaction, OrbitBehavior,
    OrbitCameraController, OrbitSettings,
};
use glam::DVec2;

use crate::floating_origin::FloatingOriginCamera;
use crate::launch_params::LaunchParams;

/// Closest the camera may get to the target, in meters.
pub const MIN_DISTANCE: f64 = 500.0;
/// Farthest the camera may get from the target, in meters.
pub const MAX_DISTANCE: f64 = 60_000_000.0;
/// Keep the camera above the target's horizon plane.
const MAX_POLAR_ANGLE: f64 = 88.0 * std::f64::consts::PI / 180.0;
/// How far panning may move the target from its starting point, in meters.
const MAX_TARGET_RADIUS: f64 = 2_000_000.0;
/// Vertical field of view for perspective cameras.
const FOV: f64 = std::f64::consts::FRAC_PI_4;
/// Pixels panned per frame while an arrow key is held.
const KEY_PAN_PIXELS: f64 = 7.0;
/// Pixel equivalent of one wheel notch on line-based devices.
const WHEEL_LINE_PIXELS: f64 = 100.0;

/// Plugin for the globe orbit camera.
pub struct OrbitCameraPlugin;

impl Plugin for OrbitCameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrbitDrag>()
            .add_message::<CameraControlEvent>()
            .add_systems(
                Update,
                (
                    orbit_mouse_input,
                    orbit_keyboard_input.run_if(not(egui_wants_any_keyboard_input)),
                    update_orbit,
                    sync_render_camera,
                    forward_control_events,
                    log_control_events,
                )
                    .chain()
                    .in_set(OrbitCameraSystems),
            );
    }
}

/// Systems that move the camera; run overlays after this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrbitCameraSystems;

/// A controller notification, with the target pose at the time it was sent.
#[derive(Message, Debug, Clone, Copy)]
pub struct CameraControlEvent {
    /// What the controller reported.
    pub event: ControlEvent,
    /// Target pose after the event.
    pub pose: CameraTargetPose,
}

/// Orbit controller state attached to the rendering camera.
#[derive(Component)]
pub struct GlobeCamera {
    /// Orbit controller driving `state`.
    pub controller: OrbitCameraController,
    /// Camera as seen by the controller.
    pub state: CameraState,
    /// Fits near and far planes for `rendered`.
    pub clip_planes: GlobeClipPlaneAdjuster,
    /// Camera as rendered this frame, after clip plane fitting.
    pub rendered: CameraState,
}

impl GlobeCamera {
    /// Build a camera looking at the launch target.
    pub fn new(ellipsoid: Ellipsoid, params: &LaunchParams) -> geomap_controls::Result<Self> {
        if !params.distance.is_finite() || params.distance <= 0.0 {
            return Err(ConfigError::OutOfRange {
                setting: "launch distance",
                value: params.distance,
                expected: "a positive distance",
            });
        }

        let target = Geodetic::from_degrees(params.lon, params.lat, 0.0).to_ecef(&ellipsoid);
        let up = ellipsoid.surface_normal(target);

        let settings = OrbitSettings {
            up,
            enable_damping: params.damping,
            min_distance: MIN_DISTANCE,
            max_distance: MAX_DISTANCE,
            max_polar_angle: MAX_POLAR_ANGLE,
            max_target_radius: MAX_TARGET_RADIUS,
            auto_rotate: params.auto_rotate,
            behavior: OrbitBehavior {
                zoom_to_cursor: params.zoom_to_cursor,
                ..default()
            },
            ..default()
        };
        let mut controller = OrbitCameraController::new(ellipsoid, settings)?;
        let clip_planes = GlobeClipPlaneAdjuster::new(ellipsoid, ClipPlaneSettings::default())?;

        let aspect = 16.0 / 9.0;
        let camera = if params.orthographic {
            // Frame the whole globe at zoom 1.
            let half_height = ellipsoid.max_radius() * 1.2;
            CameraState::orthographic(
                -half_height * aspect,
                half_height * aspect,
                half_height,
                -half_height,
                0.0,
                MAX_DISTANCE,
            )
        } else {
            CameraState::perspective(FOV, aspect, 1.0, MAX_DISTANCE)
        };
        let mut state = CameraState { up, ..camera };

        controller.set_target(target);
        controller.set_camera_position(
            &mut state,
            CameraTargetPose {
                heading: params.heading.to_radians(),
                pitch: params.pitch.to_radians(),
                distance: params.distance,
                x: 0.0,
                y: 0.0,
            },
        );

        let mut rendered = state;
        clip_planes.adjust(&mut rendered);

        Ok(Self {
            controller,
            state,
            clip_planes,
            rendered,
        })
    }

    /// Bevy projection matching the rendered camera.
    pub fn projection(&self) -> Projection {
        match self.rendered.projection {
            CameraProjection::Perspective {
                fov,
                aspect,
                near,
                far,
            } => Projection::Perspective(PerspectiveProjection {
                fov: fov as f32,
                aspect_ratio: aspect as f32,
                near: near as f32,
                far: far as f32,
                ..default()
            }),
            CameraProjection::Orthographic {
                left,
                right,
                top,
                bottom,
                zoom,
                near,
                far,
            } => Projection::Orthographic(OrthographicProjection {
                near: near as f32,
                far: far as f32,
                scaling_mode: ScalingMode::Fixed {
                    width: (right - left) as f32,
                    height: (top - bottom) as f32,
                },
                scale: (1.0 / zoom) as f32,
                ..OrthographicProjection::default_3d()
            }),
            CameraProjection::Custom { .. } => Projection::default(),
        }
    }
}

/// Mouse button currently dragging the camera.
#[derive(Resource, Default)]
struct OrbitDrag {
    button: Option<MouseButton>,
}

fn viewport_size(window: &Window) -> DVec2 {
    DVec2::new(f64::from(window.width()), f64::from(window.height()))
}

/// Convert a window cursor position to normalized device coordinates.
fn cursor_ndc(cursor: Vec2, viewport: DVec2) -> DVec2 {
    DVec2::new(
        2.0 * f64::from(cursor.x) / viewport.x - 1.0,
        1.0 - 2.0 * f64::from(cursor.y) / viewport.y,
    )
}

/// Convert a wheel movement to pixels, positive when zooming out.
fn wheel_pixels(unit: MouseScrollUnit, y: f32) -> f64 {
    let y = f64::from(y);
    match unit {
        MouseScrollUnit::Line => -y * WHEEL_LINE_PIXELS,
        MouseScrollUnit::Pixel => -y,
    }
}

/// Turn drags and wheel movement into controller input.
#[allow(clippy::needless_pass_by_value)]
fn orbit_mouse_input(
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion: MessageReader<MouseMotion>,
    mut wheel: MessageReader<MouseWheel>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
    mut drag: ResMut<OrbitDrag>,
    mut camera: Single<&mut GlobeCamera>,
) {
    let globe: &mut GlobeCamera = &mut camera;
    let viewport = viewport_size(&window);
    let pointer_over_ui = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.is_pointer_over_area());

    if let Some(button) = drag.button {
        if mouse.just_released(button) {
            drag.button = None;
            globe.controller.end_interaction();
        }
    } else if !pointer_over_ui {
        let pressed = [
            (MouseButton::Left, Interaction::Rotate),
            (MouseButton::Right, Interaction::Pan),
        ]
        .into_iter()
        .find(|(button, _)| mouse.just_pressed(*button));

        if let Some((button, interaction)) = pressed {
            drag.button = Some(button);
            globe.controller.begin_interaction(interaction);
        }
    }

    let delta: Vec2 = motion.read().map(|event| event.delta).sum();
    let delta = DVec2::new(f64::from(delta.x), f64::from(delta.y));
    if delta != DVec2::ZERO {
        match drag.button {
            Some(MouseButton::Left) => globe.controller.rotate(delta, viewport),
            Some(MouseButton::Right) => globe.controller.pan(delta, viewport, &globe.state),
            _ => {}
        }
    }

    let ndc = window
        .cursor_position()
        .map_or(DVec2::ZERO, |cursor| cursor_ndc(cursor, viewport));
    for event in wheel.read() {
        if !pointer_over_ui {
            globe
                .controller
                .zoom_wheel(wheel_pixels(event.unit, event.y), ndc, &globe.state);
        }
    }
}

/// Pan with the arrow keys and reset the pan offset with `R`.
#[allow(clippy::needless_pass_by_value)]
fn orbit_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut camera: Single<&mut GlobeCamera>,
) {
    let globe: &mut GlobeCamera = &mut camera;

    let mut delta = DVec2::ZERO;
    if keyboard.pressed(KeyCode::ArrowUp) {
        delta.y += KEY_PAN_PIXELS;
    }
    if keyboard.pressed(KeyCode::ArrowDown) {
        delta.y -= KEY_PAN_PIXELS;
    }
    if keyboard.pressed(KeyCode::ArrowLeft) {
        delta.x += KEY_PAN_PIXELS;
    }
    if keyboard.pressed(KeyCode::ArrowRight) {
        delta.x -= KEY_PAN_PIXELS;
    }
    if delta != DVec2::ZERO {
        globe
            .controller
            .pan(delta, viewport_size(&window), &globe.state);
    }

    if keyboard.just_pressed(KeyCode::KeyR) {
        globe.controller.reset_pan_offset();
        tracing::info!("Pan offset reset");
    }
}

/// Integrate input and fit the clip planes for rendering.
#[allow(clippy::needless_pass_by_value)]
fn update_orbit(
    time: Res<Time>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut camera: Single<&mut GlobeCamera>,
) {
    let globe: &mut GlobeCamera = &mut camera;

    let viewport = viewport_size(&window);
    if viewport.y > 0.0 {
        globe.state.projection.set_aspect(viewport.x / viewport.y);
    }

    globe
        .controller
        .update(&mut globe.state, Some(f64::from(time.delta_secs())));

    // Orthographic fitting moves the camera, so it works on a copy that
    // the controller never sees.
    globe.rendered = globe.state;
    globe.clip_planes.adjust(&mut globe.rendered);
}

/// Copy the rendered camera into Bevy components.
fn sync_render_camera(
    mut query: Query<(
        &GlobeCamera,
        &mut Transform,
        &mut Projection,
        &mut FloatingOriginCamera,
    )>,
) {
    for (globe, mut transform, mut projection, mut origin) in &mut query {
        origin.position = globe.rendered.position;
        transform.translation = Vec3::ZERO;
        transform.rotation = globe.rendered.orientation.as_quat();
        *projection = globe.projection();
    }
}

/// Re-emit queued controller events as Bevy messages.
fn forward_control_events(
    mut camera: Single<&mut GlobeCamera>,
    mut writer: MessageWriter<CameraControlEvent>,
) {
    let pose = camera.controller.target_pose();
    for event in camera.controller.drain_events() {
        writer.write(CameraControlEvent { event, pose });
    }
}

fn log_control_events(mut events: MessageReader<CameraControlEvent>) {
    for message in events.read() {
        match message.event {
            ControlEvent::Start => tracing::debug!("Camera interaction started"),
            ControlEvent::End => tracing::debug!(
                "Camera interaction ended at heading {:.1}°, pitch {:.1}°, distance {:.0} m",
                message.pose.heading.to_degrees(),
                message.pose.pitch.to_degrees(),
                message.pose.distance
            ),
            ControlEvent::Change | ControlEvent::TargetChange => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_ndc_corners() {
        let viewport = DVec2::new(800.0, 600.0);
        assert_eq!(cursor_ndc(Vec2::new(400.0, 300.0), viewport), DVec2::ZERO);
        assert_eq!(cursor_ndc(Vec2::ZERO, viewport), DVec2::new(-1.0, 1.0));
        assert_eq!(cursor_ndc(Vec2::new(800.0, 600.0), viewport), DVec2::new(1.0, -1.0));
    }

    #[test]
    fn test_wheel_up_zooms_in() {
        assert_eq!(wheel_pixels(MouseScrollUnit::Line, 1.0), -WHEEL_LINE_PIXELS);
        assert_eq!(wheel_pixels(MouseScrollUnit::Pixel, -40.0), 40.0);
    }

    #[test]
    fn test_globe_camera_from_launch_params() {
        let params = LaunchParams::default();
        let globe = GlobeCamera::new(Ellipsoid::WGS84, &params).unwrap();

        let pose = globe.controller.invert_camera_hpd(&globe.state);
        assert!((pose.distance - params.distance).abs() < 1e-3);
        assert!((pose.pitch.to_degrees() - params.pitch).abs() < 1e-6);
        assert!((pose.heading.to_degrees() - params.heading).abs() < 1e-6);

        // Clip planes are fitted on the rendered copy only.
        assert!(globe.rendered.projection.far() > globe.rendered.projection.near());
        assert_eq!(globe.rendered.position, globe.state.position);
        assert!(matches!(globe.projection(), Projection::Perspective(_)));
    }

    #[test]
    fn test_orthographic_launch_moves_rendered_camera_only() {
        let params = LaunchParams {
            orthographic: true,
            ..LaunchParams::default()
        };
        let globe = GlobeCamera::new(Ellipsoid::WGS84, &params).unwrap();
        assert_eq!(globe.rendered.projection.near(), 0.0);
        assert_ne!(globe.rendered.position, globe.state.position);
        assert!(matches!(globe.projection(), Projection::Orthographic(_)));
    }

    #[test]
    fn test_invalid_launch_distance() {
        let params = LaunchParams {
            distance: -1.0,
            ..LaunchParams::default()
        };
        assert!(GlobeCamera::new(Ellipsoid::WGS84, &params).is_err());
    }
}
