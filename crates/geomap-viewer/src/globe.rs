//! The rendered globe: an ellipsoid mesh with a latitude/longitude grid and
//! a marker at the orbit target.

use bevy::color::palettes::css;
use bevy::prelude::*;
use geomap_controls::{Ellipsoid, Geodetic, LocalFrame};
use glam::DVec3;

use crate::camera::{GlobeCamera, OrbitCameraSystems};
use crate::floating_origin::{FloatingOrigin, WorldPosition};

/// Spacing of graticule lines in degrees.
const GRID_SPACING: usize = 15;
/// Sampling step along graticule lines in degrees.
const GRID_STEP: usize = 3;

/// Plugin for the globe mesh and overlays.
pub struct GlobePlugin;

impl Plugin for GlobePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Globe>()
            .add_systems(Startup, spawn_globe)
            .add_systems(Update, draw_overlays.after(OrbitCameraSystems));
    }
}

/// The ellipsoid being viewed.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct Globe {
    /// Reference ellipsoid in ECEF.
    pub ellipsoid: Ellipsoid,
}

fn spawn_globe(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    globe: Res<Globe>,
) {
    let radii = globe.ellipsoid.radii().as_vec3();

    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(1.0).mesh().uv(360, 180))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.12, 0.28, 0.52),
            perceptual_roughness: 0.9,
            ..default()
        })),
        // The unit sphere's poles lie on Y; ECEF puts them on Z, but a
        // sphere is symmetric so scaling by the radii is enough.
        Transform::from_scale(radii),
        WorldPosition(DVec3::ZERO),
    ));

    tracing::info!(
        "Globe spawned with radii {:.0} m / {:.3} m",
        globe.ellipsoid.equatorial_radius(),
        globe.ellipsoid.polar_radius()
    );
}

/// Points along a line of constant longitude, pole to pole.
fn meridian(ellipsoid: &Ellipsoid, longitude: i32) -> impl Iterator<Item = DVec3> + '_ {
    (-90_i32..=90).step_by(GRID_STEP).map(move |latitude| {
        Geodetic::from_degrees(f64::from(longitude), f64::from(latitude), 0.0).to_ecef(ellipsoid)
    })
}

/// Points along a closed line of constant latitude.
fn parallel(ellipsoid: &Ellipsoid, latitude: i32) -> impl Iterator<Item = DVec3> + '_ {
    (-180_i32..=180).step_by(GRID_STEP).map(move |longitude| {
        Geodetic::from_degrees(f64::from(longitude), f64::from(latitude), 0.0).to_ecef(ellipsoid)
    })
}

#[allow(clippy::needless_pass_by_value)]
fn draw_overlays(mut gizmos: Gizmos, globe: Res<Globe>, camera: Single<&GlobeCamera>) {
    let ellipsoid = &globe.ellipsoid;
    // The origin resource is only synced in PostUpdate; use this frame's camera.
    let origin = FloatingOrigin {
        position: camera.rendered.position,
    };

    let grid = Color::srgba(1.0, 1.0, 1.0, 0.25);
    for longitude in (-180..180).step_by(GRID_SPACING) {
        gizmos.linestrip(meridian(ellipsoid, longitude).map(|p| origin.to_render(p)), grid);
    }
    for latitude in (-90..90).step_by(GRID_SPACING).skip(1) {
        let color = if latitude == 0 { css::GOLD.into() } else { grid };
        gizmos.linestrip(parallel(ellipsoid, latitude).map(|p| origin.to_render(p)), color);
    }

    // Orbit target with its local frame, scaled with the viewing distance.
    let target = camera.controller.target();
    let size = camera.controller.target_pose().distance * 0.03;
    let frame = LocalFrame::at(ellipsoid, target);
    let center = origin.to_render(target);
    for (axis, color) in [
        (frame.east, css::RED),
        (frame.north, css::LIME),
        (frame.up, css::DODGER_BLUE),
    ] {
        gizmos.arrow(center, origin.to_render(target + axis * size), color);
    }
    gizmos.sphere(Isometry3d::from_translation(center), (size * 0.2) as f32, css::WHITE);

    // Link back to the unpanned target while a pan offset is active.
    let raw_target = camera.controller.raw_target();
    if (target - raw_target).length() > size * 0.01 {
        gizmos.line(origin.to_render(raw_target), center, css::ORANGE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graticule_lines_lie_on_surface() {
        let e = Ellipsoid::WGS84;
        for p in meridian(&e, 45).chain(parallel(&e, -30)) {
            assert!(e.elevation(p).abs() < 1e-3);
        }
        assert_eq!(meridian(&e, 0).count(), 61);

        // Parallels close on themselves.
        let points: Vec<_> = parallel(&e, 60).collect();
        let (first, last) = (points[0], points[points.len() - 1]);
        assert!((first - last).length() < 1e-6);
    }
}
