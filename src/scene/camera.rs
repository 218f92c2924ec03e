//! Camera projection used to compute on-screen viewport positions.

use glam::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Projects world-space points into normalized viewport space.
pub trait Camera {
    /// Returns `(x, y, depth)`: `x`/`y` in viewport space with a bottom-left
    /// origin (inside the frame when both lie in `[0, 1]`), `depth` the
    /// distance in front of the camera (non-positive when behind it).
    fn world_to_viewport(&self, world: Vec3) -> Vec3;
}

/// Perspective camera looking down its local -Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.3,
            far: 1000.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::default()
        }
    }

    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far)
    }
}

impl Camera for PerspectiveCamera {
    fn world_to_viewport(&self, world: Vec3) -> Vec3 {
        let view = self.view_matrix().transform_point3(world);
        let depth = -view.z;
        // Too close to project: report it as not in front of the camera.
        if depth <= f32::EPSILON {
            return Vec3::new(0.5, 0.5, depth.min(0.0));
        }

        let clip = self.projection_matrix() * Vec4::new(view.x, view.y, view.z, 1.0);
        let ndc = clip.truncate() / clip.w;
        Vec3::new((ndc.x + 1.0) * 0.5, (ndc.y + 1.0) * 0.5, depth)
    }
}
