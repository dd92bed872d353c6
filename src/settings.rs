use serde::{Deserialize, Serialize};

use crate::input::{KeyCode, NamedKey};
use crate::lights::DEFAULT_MARKER_SCALE;
use crate::render::{LIGHTS_OFFSET, LIGHT_STRIDE};

/// Light slots compiled into the shader when the scene does not say otherwise.
pub const DEFAULT_MAX_LIGHTS: usize = 16;

/// Most light slots whose global block still fits a 64 KiB uniform binding.
pub const MAX_LIGHTS_LIMIT: usize = (65536 - LIGHTS_OFFSET) / LIGHT_STRIDE;

/// Tunables read from the scene's `<settings>` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per second for a cursor sweep of one full viewport.
    pub look_sensitivity: f32,
    pub max_lights: usize,
    pub marker_scale: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub bindings: KeyBindings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            look_sensitivity: 5000.0,
            max_lights: DEFAULT_MAX_LIGHTS,
            marker_scale: DEFAULT_MARKER_SCALE,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            bindings: KeyBindings::default(),
        }
    }
}

/// Keys driving the camera and the light editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
    pub add_light: KeyCode,
    pub remove_light: KeyCode,
    pub next_light: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::Character('W'),
            back: KeyCode::Character('S'),
            left: KeyCode::Character('A'),
            right: KeyCode::Character('D'),
            up: KeyCode::Named(NamedKey::Space),
            down: KeyCode::Named(NamedKey::LeftShift),
            add_light: KeyCode::Named(NamedKey::Plus),
            remove_light: KeyCode::Named(NamedKey::Minus),
            next_light: KeyCode::Named(NamedKey::Tab),
        }
    }
}

impl KeyBindings {
    /// Rebinds the action called `action`; returns false for unknown actions.
    pub fn set(&mut self, action: &str, key: KeyCode) -> bool {
        let slot = match action {
            "forward" => &mut self.forward,
            "back" => &mut self.back,
            "left" => &mut self.left,
            "right" => &mut self.right,
            "up" => &mut self.up,
            "down" => &mut self.down,
            "add_light" => &mut self.add_light,
            "remove_light" => &mut self.remove_light,
            "next_light" => &mut self.next_light,
            _ => return false,
        };
        *slot = key;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_limit_fits_uniform_binding() {
        assert_eq!(MAX_LIGHTS_LIMIT, 1362);
        assert!(LIGHTS_OFFSET + MAX_LIGHTS_LIMIT * LIGHT_STRIDE <= 65536);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{"move_speed": 6.0, "bindings": {"up": {"Character": "E"}}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.move_speed, 6.0);
        assert_eq!(settings.max_lights, DEFAULT_MAX_LIGHTS);
        assert_eq!(settings.bindings.up, KeyCode::Character('E'));
        assert_eq!(settings.bindings.forward, KeyCode::Character('W'));

        let text = serde_json::to_string(&settings).unwrap();
        assert_eq!(serde_json::from_str::<Settings>(&text).unwrap(), settings);
    }

    #[test]
    fn rebinding_known_and_unknown_actions() {
        let mut bindings = KeyBindings::default();
        assert!(bindings.set("up", KeyCode::Character('E')));
        assert_eq!(bindings.up, KeyCode::Character('E'));
        assert!(!bindings.set("jump", KeyCode::Character('J')));
    }
}
