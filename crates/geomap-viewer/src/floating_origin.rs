//! Camera-relative rendering for ECEF-scale scenes.
//!
//! Globe coordinates are millions of meters, far beyond what f32 transforms
//! can hold without visible jitter. Positions are kept in f64 and each frame
//! every [`WorldPosition`] is written to its `Transform` relative to the
//! camera, which itself always renders at the origin.

use bevy::prelude::*;
use bevy::transform::TransformSystems;
use glam::DVec3;

/// Plugin for camera-relative transforms.
pub struct FloatingOriginPlugin;

impl Plugin for FloatingOriginPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FloatingOrigin>().add_systems(
            PostUpdate,
            (sync_origin_to_camera, place_relative_to_origin)
                .chain()
                .before(TransformSystems::Propagate),
        );
    }
}

/// ECEF position that currently maps to the render origin.
#[derive(Resource, Default)]
pub struct FloatingOrigin {
    /// Camera position in ECEF meters.
    pub position: DVec3,
}

impl FloatingOrigin {
    /// Convert an ECEF position to render space.
    pub fn to_render(&self, position: DVec3) -> Vec3 {
        (position - self.position).as_vec3()
    }
}

/// ECEF position of an entity rendered relative to the floating origin.
#[derive(Component, Clone, Copy, Debug)]
pub struct WorldPosition(pub DVec3);

/// The camera that defines the floating origin.
#[derive(Component, Debug)]
pub struct FloatingOriginCamera {
    /// Camera position in ECEF meters.
    pub position: DVec3,
}

fn sync_origin_to_camera(mut origin: ResMut<FloatingOrigin>, camera: Single<&FloatingOriginCamera>) {
    origin.position = camera.position;
}

fn place_relative_to_origin(
    origin: Res<FloatingOrigin>,
    mut query: Query<(&WorldPosition, &mut Transform), Without<FloatingOriginCamera>>,
) {
    for (world, mut transform) in &mut query {
        transform.translation = origin.to_render(world.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_render_is_camera_relative() {
        let origin = FloatingOrigin {
            position: DVec3::new(6_378_137.0, 1_000.0, -250.5),
        };
        let rendered = origin.to_render(DVec3::new(6_378_140.0, 1_000.0, -250.0));
        assert_eq!(rendered, Vec3::new(3.0, 0.0, 0.5));
    }
}
