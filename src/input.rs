use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if let Some(digit) = ch.to_digit(10) {
                return Some(Self::Digit(digit as u8));
            }
        }
        if let Some(function) = name.strip_prefix('F').or_else(|| name.strip_prefix('f')) {
            if let Ok(index) = function.parse::<u8>() {
                if (1..=25).contains(&index) {
                    return Some(Self::Function(index));
                }
            }
        }
        None
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Backspace" => Backspace,
        "Home" => Home,
        "End" => End,
        "PageUp" => PageUp,
        "PageDown" => PageDown,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        "LeftAlt" | "LAlt" => LeftAlt,
        "RightAlt" | "RAlt" => RightAlt,
        "Plus" | "+" => Plus,
        "Minus" | "-" => Minus,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Friendly names for the keyboard keys the sandbox binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    Home,
    End,
    PageUp,
    PageDown,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
    Plus,
    Minus,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Input snapshot polled once per frame by the scene.
///
/// Cursor motion is accumulated as a delta in viewport units, so a sweep
/// across the full window width is a delta of 1.0 regardless of its size.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    cursor: Option<Vec2>,
    cursor_delta: Vec2,
    viewport: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        if self.keys.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn set_mouse_button_down(&mut self, button: MouseButton) {
        self.mouse_buttons.insert(button);
    }

    pub fn set_mouse_button_up(&mut self, button: MouseButton) {
        self.mouse_buttons.remove(&button);
    }

    /// Records a new cursor position in physical pixels.
    pub fn set_cursor_position(&mut self, position: Vec2) {
        if let Some(previous) = self.cursor.replace(position) {
            let width = self.viewport.0.max(1) as f32;
            let height = self.viewport.1.max(1) as f32;
            self.cursor_delta += (position - previous) / Vec2::new(width, height);
        }
    }

    /// Forgets the last cursor position so re-entering the window does not jump.
    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// True only on the frame the key went down.
    pub fn was_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn cursor_delta(&self) -> Vec2 {
        self.cursor_delta
    }

    /// Clears per-frame edges and the accumulated cursor delta.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.cursor_delta = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_character_keys() {
        assert_eq!(
            KeyCode::from_name("Space"),
            Some(KeyCode::Named(NamedKey::Space))
        );
        assert_eq!(KeyCode::from_name("w"), Some(KeyCode::Character('W')));
        assert_eq!(KeyCode::from_name("7"), Some(KeyCode::Digit(7)));
        assert_eq!(KeyCode::from_name("+"), Some(KeyCode::Named(NamedKey::Plus)));
        assert_eq!(KeyCode::from_name("F12"), Some(KeyCode::Function(12)));
        assert_eq!(KeyCode::from_name("F40"), None);
        assert_eq!(KeyCode::from_name("Hyper"), None);
    }

    #[test]
    fn press_edges_last_one_frame() {
        let mut state = InputState::new();
        let tab = KeyCode::Named(NamedKey::Tab);
        state.set_key_down(tab);
        assert!(state.was_key_pressed(tab));
        state.end_frame();
        assert!(state.is_key_down(tab));
        assert!(!state.was_key_pressed(tab));

        // Auto-repeat while held is not a new press.
        state.set_key_down(tab);
        assert!(!state.was_key_pressed(tab));
        state.set_key_up(tab);
        assert!(!state.is_key_down(tab));
    }

    #[test]
    fn cursor_delta_is_normalized_by_viewport() {
        let mut state = InputState::new();
        state.set_viewport(800, 400);
        state.set_cursor_position(Vec2::new(100.0, 100.0));
        assert_eq!(state.cursor_delta(), Vec2::ZERO);
        state.set_cursor_position(Vec2::new(500.0, 200.0));
        state.set_cursor_position(Vec2::new(500.0, 300.0));
        assert!(state.cursor_delta().abs_diff_eq(Vec2::new(0.5, 0.5), 1e-6));
        state.end_frame();
        assert_eq!(state.cursor_delta(), Vec2::ZERO);

        state.cursor_left();
        state.set_cursor_position(Vec2::new(0.0, 0.0));
        assert_eq!(state.cursor_delta(), Vec2::ZERO);
    }

    #[test]
    fn input_state_tracks_mouse_buttons() {
        let mut state = InputState::new();
        state.set_mouse_button_down(MouseButton::RIGHT);
        assert!(state.is_mouse_button_down(MouseButton::new(1)));
        state.set_mouse_button_up(MouseButton::RIGHT);
        assert!(!state.is_mouse_button_down(MouseButton::RIGHT));
    }
}
