use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::input::InputState;
use crate::orientation::Orientation;
use crate::settings::{KeyBindings, Settings};

/// Signed movement axes for one frame, each in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveIntent {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
}

impl MoveIntent {
    pub fn from_input(input: &InputState, bindings: &KeyBindings) -> Self {
        let axis = |positive, negative| {
            let mut value = 0.0;
            if input.is_key_down(positive) {
                value += 1.0;
            }
            if input.is_key_down(negative) {
                value -= 1.0;
            }
            value
        };
        Self {
            forward: axis(bindings.forward, bindings.back),
            right: axis(bindings.right, bindings.left),
            up: axis(bindings.up, bindings.down),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.forward == 0.0 && self.right == 0.0 && self.up == 0.0
    }
}

/// Fly camera: a position plus an [`Orientation`] steered by mouse-look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeLookCamera {
    pub position: Vec3,
    pub orientation: Orientation,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub move_speed: f32,
    pub look_sensitivity: f32,
}

impl Default for FreeLookCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1.0, 5.0), Orientation::new(0.0, -90.0, 0.0))
    }
}

impl FreeLookCamera {
    pub fn new(position: Vec3, mut orientation: Orientation) -> Self {
        orientation.normalize();
        let settings = Settings::default();
        Self {
            position,
            orientation,
            fov: settings.fov,
            near: settings.near,
            far: settings.far,
            move_speed: settings.move_speed,
            look_sensitivity: settings.look_sensitivity,
        }
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.fov = settings.fov;
        self.near = settings.near;
        self.far = settings.far;
        self.move_speed = settings.move_speed;
        self.look_sensitivity = settings.look_sensitivity;
    }

    /// Turns the camera by a cursor delta given in viewport units.
    pub fn look(&mut self, cursor_delta: Vec2, dt: f32) {
        let scale = self.look_sensitivity * dt;
        self.orientation
            .update(-cursor_delta.y * scale, cursor_delta.x * scale);
        self.orientation.normalize();
    }

    /// Moves along the look direction, its horizontal right vector and world up.
    pub fn translate(&mut self, intent: MoveIntent, dt: f32) {
        if intent.is_idle() {
            return;
        }
        let step = self.move_speed * dt;
        self.position += (self.forward() * intent.forward
            + self.right() * intent.right
            + Vec3::Y * intent.up)
            * step;
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation.to_vector()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov.to_radians(),
            aspect.max(0.01),
            self.near,
            self.far,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, NamedKey};

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = FreeLookCamera::default();
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(camera.right().abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn look_scales_by_sensitivity_and_time() {
        let mut camera = FreeLookCamera::default();
        camera.look_sensitivity = 100.0;
        camera.look(Vec2::new(0.5, -0.25), 0.1);
        assert!((camera.orientation.yaw - (-85.0)).abs() < 1e-4);
        assert!((camera.orientation.pitch - 2.5).abs() < 1e-4);

        camera.look(Vec2::new(0.0, -100.0), 1.0);
        assert_eq!(camera.orientation.pitch, 89.0);
    }

    #[test]
    fn translate_follows_intent() {
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Character('W'));
        input.set_key_down(KeyCode::Named(NamedKey::Space));
        let intent = MoveIntent::from_input(&input, &KeyBindings::default());
        assert_eq!(intent.forward, 1.0);
        assert_eq!(intent.up, 1.0);
        assert_eq!(intent.right, 0.0);

        let mut camera = FreeLookCamera::new(Vec3::ZERO, Orientation::new(0.0, -90.0, 0.0));
        camera.move_speed = 2.0;
        camera.translate(intent, 0.5);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 1.0, -1.0), 1e-5));
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Character('A'));
        input.set_key_down(KeyCode::Character('D'));
        assert!(MoveIntent::from_input(&input, &KeyBindings::default()).is_idle());
    }

    #[test]
    fn view_matrix_maps_forward_to_negative_z() {
        let camera = FreeLookCamera::new(Vec3::new(1.0, 2.0, 3.0), Orientation::new(0.0, 0.0, 0.0));
        let ahead = camera.view_matrix().transform_point3(camera.position + camera.forward());
        assert!(ahead.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }
}
