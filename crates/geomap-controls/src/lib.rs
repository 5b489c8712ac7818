//! Orbit camera controls for navigating an ellipsoidal globe.
//!
//! This crate provides the math and state needed to fly a camera around a
//! planet-sized ellipsoid: geodetic conversions, a heading/pitch/distance
//! camera description, a damped orbit controller and per-frame clip plane
//! fitting. It has no renderer dependency; hosts copy their camera into a
//! [`CameraState`], run the controller, and copy the result back.
//!
//! # Design principles
//!
//! - **Frame-synchronous**: Input only enqueues deltas; [`OrbitCameraController::update`]
//!   integrates them once per frame
//! - **Double precision**: All positions are ECEF `DVec3` in meters
//! - **No globals**: Every controller owns its state, so several can coexist
//!
//! # Example
//!
//! ```ignore
//! use geomap_controls::{
//!     CameraState, CameraTargetPose, Ellipsoid, Geodetic, OrbitCameraController, OrbitSettings,
//! };
//!
//! let ellipsoid = Ellipsoid::WGS84;
//! let target = Geodetic::from_degrees(-74.0, 40.7, 0.0).to_ecef(&ellipsoid);
//! let up = ellipsoid.surface_normal(target);
//!
//! let mut camera = CameraState { up, ..CameraState::perspective(0.8, 1.5, 1.0, 1e8) };
//! let mut controller = OrbitCameraController::new(ellipsoid, OrbitSettings { up, ..Default::default() })?;
//! controller.set_target(target);
//! controller.set_camera_position(&mut camera, CameraTargetPose { distance: 5000.0, pitch: 0.6, ..Default::default() });
//!
//! // Each frame:
//! controller.rotate_left(0.01);
//! if controller.update(&mut camera, Some(1.0 / 60.0)) {
//!     println!("{:?}", controller.target_pose());
//! }
//! ```

pub mod camera;
pub mod clip_planes;
pub mod ellipsoid;
mod error;
pub mod geodetic;
pub mod orbit;
pub mod point_of_view;

pub use camera::{CameraProjection, CameraState, look_rotation};
pub use clip_planes::{ClipPlaneSettings, ClipPlanes, GlobeClipPlaneAdjuster};
pub use ellipsoid::{Ellipsoid, Ray, WGS84_EQUATORIAL_RADIUS, WGS84_POLAR_RADIUS};
pub use error::{ConfigError, Result};
pub use geodetic::{Geodetic, LocalFrame, lon_lat_to_ecef, wrap_longitude};
pub use orbit::{
    CameraTargetPose, ControlEvent, Interaction, OrbitBehavior, OrbitCameraController,
    OrbitSettings, OrbitState, Spherical, clamp_azimuth,
};
pub use point_of_view::{
    CameraPose, GeodeticView, PointOfView, camera_geodetic_view, move_to,
};
