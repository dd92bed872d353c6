use glam::Vec3;
use log::warn;
use serde::{Deserialize, Serialize};

/// Pitch never reaches ±90 so the forward vector never collapses onto the up axis.
pub const PITCH_LIMIT: f32 = 89.0;

// Beyond this magnitude the ±360 stepping is replaced by a remainder.
const YAW_STEP_LIMIT: f32 = 360.0 * 64.0;

/// Euler angles, in degrees, driving the camera's look direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: f32,
    pub yaw: f32,
    /// Carried for completeness; the look direction ignores it.
    pub roll: f32,
}

impl Orientation {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Accumulates deltas that the caller has already scaled by frame time
    /// and sensitivity. Call [`Orientation::normalize`] afterwards.
    pub fn update(&mut self, pitch_delta: f32, yaw_delta: f32) {
        self.pitch += pitch_delta;
        self.yaw += yaw_delta;
    }

    /// Clamps pitch to `[-89, 89]` and wraps yaw into `[-180, 180]`.
    pub fn normalize(&mut self) {
        if !self.pitch.is_finite() {
            warn!("non-finite pitch {} reset to 0", self.pitch);
            self.pitch = 0.0;
        }
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

        if !self.yaw.is_finite() {
            warn!("non-finite yaw {} reset to 0", self.yaw);
            self.yaw = 0.0;
        }
        if self.yaw.abs() > YAW_STEP_LIMIT {
            self.yaw = self.yaw.rem_euclid(360.0);
        }
        while self.yaw > 180.0 {
            self.yaw -= 360.0;
        }
        while self.yaw < -180.0 {
            self.yaw += 360.0;
        }
    }

    /// Unit look direction for the current pitch and yaw.
    pub fn to_vector(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch)
    }
}
