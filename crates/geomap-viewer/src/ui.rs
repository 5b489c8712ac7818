//! Debug UI for inspecting and editing the orbit camera.
//!
//! Shows FPS, camera position, clip planes and the target pose, which can be
//! edited directly.

use std::ops::RangeInclusive;

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use geomap_controls::{Geodetic, camera_geodetic_view};

use crate::camera::{GlobeCamera, MAX_DISTANCE, MIN_DISTANCE};

/// Plugin for debug UI overlay.
pub struct DebugUiPlugin;

impl Plugin for DebugUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default())
            .add_systems(EguiPrimaryContextPass, debug_ui_system);
    }
}

/// Format a distance with a unit suited to its magnitude.
fn format_distance(meters: f64) -> String {
    let magnitude = meters.abs();
    if magnitude >= 1_000_000.0 {
        format!("{:.1} Mm", meters / 1_000_000.0)
    } else if magnitude >= 1_000.0 {
        format!("{:.1} km", meters / 1_000.0)
    } else {
        format!("{meters:.0} m")
    }
}

/// Edit an angle stored in radians through a degree-valued drag field.
fn angle_field(
    ui: &mut egui::Ui,
    label: &str,
    radians: &mut f64,
    range: RangeInclusive<f64>,
) -> bool {
    let mut degrees = radians.to_degrees();
    let changed = ui
        .horizontal(|ui| {
            ui.label(label);
            ui.add(
                egui::DragValue::new(&mut degrees)
                    .range(range)
                    .speed(0.5)
                    .suffix("°"),
            )
            .changed()
        })
        .inner;
    if changed {
        *radians = degrees.to_radians();
    }
    changed
}

fn meters_field(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f64,
    range: RangeInclusive<f64>,
) -> bool {
    ui.horizontal(|ui| {
        ui.label(label);
        let speed = (value.abs() * 0.01).max(1.0);
        ui.add(
            egui::DragValue::new(value)
                .range(range)
                .speed(speed)
                .suffix(" m"),
        )
        .changed()
    })
    .inner
}

/// Render the debug UI overlay.
#[allow(clippy::needless_pass_by_value)]
fn debug_ui_system(
    mut contexts: EguiContexts,
    diagnostics: Res<DiagnosticsStore>,
    mut camera: Single<&mut GlobeCamera>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    let globe: &mut GlobeCamera = &mut camera;

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(bevy::diagnostic::Diagnostic::smoothed)
        .unwrap_or(0.0);

    let ellipsoid = *globe.controller.ellipsoid();
    let position = Geodetic::from_ecef(&ellipsoid, globe.state.position);
    let view = camera_geodetic_view(&ellipsoid, &globe.state);
    let (near, far) = (
        globe.rendered.projection.near(),
        globe.rendered.projection.far(),
    );

    let mut pose = globe.controller.target_pose();
    let mut settings = *globe.controller.settings();
    let mut pose_changed = false;
    let mut reset_pan = false;

    egui::Window::new("Camera")
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {fps:.0}"));
            ui.label(format!(
                "Camera: {:.4}°, {:.4}°",
                position.latitude_degrees(),
                position.longitude_degrees()
            ));
            ui.label(format!("Altitude: {}", format_distance(position.height)));
            ui.label(format!(
                "Clip planes: {} / {}",
                format_distance(near),
                format_distance(far)
            ));
            match view {
                Some(view) => ui.label(format!(
                    "Looking at: {:.4}°, {:.4}°",
                    view.latitude.to_degrees(),
                    view.longitude.to_degrees()
                )),
                None => ui.label("Looking at: sky"),
            };

            ui.separator();
            ui.label("Target pose:");
            pose_changed |= angle_field(ui, "Heading:", &mut pose.heading, -180.0..=180.0);
            pose_changed |= angle_field(ui, "Pitch:", &mut pose.pitch, -89.0..=89.0);
            pose_changed |= meters_field(
                ui,
                "Distance:",
                &mut pose.distance,
                MIN_DISTANCE..=MAX_DISTANCE,
            );
            pose_changed |= meters_field(ui, "Offset X:", &mut pose.x, -1e7..=1e7);
            pose_changed |= meters_field(ui, "Offset Y:", &mut pose.y, -1e7..=1e7);
            reset_pan = ui.button("Reset pan offset").clicked();

            ui.separator();
            ui.checkbox(&mut settings.enable_damping, "Damping");
            ui.checkbox(&mut settings.auto_rotate, "Auto-rotate");
            ui.checkbox(&mut settings.behavior.zoom_to_cursor, "Zoom to cursor");

            ui.separator();
            ui.label("Controls:");
            ui.label("  Left drag - Orbit");
            ui.label("  Right drag / arrows - Pan");
            ui.label("  Wheel - Zoom");
            ui.label("  R - Reset pan offset");
        });

    let GlobeCamera {
        controller, state, ..
    } = globe;
    controller.set_damping(settings.enable_damping);
    controller.set_auto_rotate(settings.auto_rotate);
    controller.set_zoom_to_cursor(settings.behavior.zoom_to_cursor);

    if pose_changed {
        controller.set_camera_position(state, pose);
    }
    if reset_pan {
        controller.reset_pan_offset();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance_units() {
        assert_eq!(format_distance(12.4), "12 m");
        assert_eq!(format_distance(2_500.0), "2.5 km");
        assert_eq!(format_distance(12_000_000.0), "12.0 Mm");
        assert_eq!(format_distance(-4_200.0), "-4.2 km");
    }
}
