//! Interactive globe viewer using Bevy.
//!
//! This application renders a WGS84 ellipsoid and lets you orbit, pan and
//! zoom around a target on its surface with the geodetic orbit controls.

mod camera;
mod floating_origin;
mod globe;
mod launch_params;
mod ui;

use bevy::light::light_consts::lux;
use bevy::prelude::*;
use camera::{GlobeCamera, OrbitCameraPlugin};
use floating_origin::{FloatingOriginCamera, FloatingOriginPlugin};
use globe::{Globe, GlobePlugin};
use launch_params::LaunchParams;
use ui::DebugUiPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            FloatingOriginPlugin,
            OrbitCameraPlugin,
            GlobePlugin,
            DebugUiPlugin,
        ))
        .add_systems(Startup, setup_scene);
    }
}

/// Spawn the orbit camera and the sun.
#[allow(clippy::needless_pass_by_value)]
fn setup_scene(mut commands: Commands, params: Res<LaunchParams>, globe: Res<Globe>) -> Result {
    let globe_camera = match GlobeCamera::new(globe.ellipsoid, &params) {
        Ok(camera) => camera,
        Err(error) => {
            tracing::error!("Invalid launch parameters ({error}), using defaults");
            GlobeCamera::new(globe.ellipsoid, &LaunchParams::default())?
        }
    };

    // The camera's Transform stays at the origin; the floating origin places
    // everything else relative to its ECEF position.
    commands.spawn((
        Camera3d::default(),
        Camera {
            clear_color: bevy::camera::ClearColorConfig::Custom(Color::BLACK),
            ..default()
        },
        Transform::from_rotation(globe_camera.rendered.orientation.as_quat()),
        globe_camera.projection(),
        FloatingOriginCamera {
            position: globe_camera.rendered.position,
        },
        globe_camera,
    ));

    // Sunlight from a fixed direction so the globe shows a terminator.
    commands.spawn((
        DirectionalLight {
            illuminance: lux::AMBIENT_DAYLIGHT,
            ..default()
        },
        Transform::default().looking_to(Vec3::new(-1.0, -0.6, -0.3), Vec3::Z),
    ));

    tracing::info!(
        "Scene setup complete - target {:.4}°, {:.4}°",
        params.lat,
        params.lon
    );
    Ok(())
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    tracing::info!("Launching with {params:?}");

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "geomap-viewer".to_string(),
        resolution: (1280, 720).into(),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }))
    .insert_resource(params)
    .add_plugins(AppPlugin)
    .run();
}
