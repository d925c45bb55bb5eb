use crate::geometry::Ray;
use glam::{EulerRot, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

/// First-person perspective camera. Rotation is yaw then pitch (YXZ order).
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(fov: f32, aspect: f32) -> Self {
        Self { position: Vec3::ZERO, yaw: 0.0, pitch: 0.0, fov, aspect }
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    /// Forward direction flattened onto the floor plane.
    pub fn heading(&self) -> Vec3 {
        let forward = self.forward();
        Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero()
    }

    /// Ray from the eye through the centre of the screen.
    pub fn center_ray(&self) -> Ray {
        Ray::new(self.position, self.forward())
    }

    /// Mouse look from raw pointer movement.
    pub fn look(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        self.yaw -= dx * sensitivity;
        self.pitch = (self.pitch - dy * sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    pub fn reset_look(&mut self) {
        self.yaw = 0.0;
        self.pitch = 0.0;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(75f32.to_radians(), 800.0 / 600.0)
    }
}
