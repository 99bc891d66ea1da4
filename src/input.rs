use std::collections::HashSet;

use glam::Vec2;
use winit::keyboard::KeyCode;

use crate::camera::CameraInput;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PointerMode {
    #[default]
    Absolute,
    /// Pointer is captured and only deltas are reported.
    Relative,
}

/// Logical keys the game reacts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    RollLeft,
    RollRight,
    Home,
    Exit,
    CyclePreset,
    LoseDevice,
}

impl Key {
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        let key = match code {
            KeyCode::KeyW | KeyCode::ArrowUp => Self::Forward,
            KeyCode::KeyS | KeyCode::ArrowDown => Self::Back,
            KeyCode::KeyA | KeyCode::ArrowLeft => Self::Left,
            KeyCode::KeyD | KeyCode::ArrowRight => Self::Right,
            KeyCode::Space | KeyCode::PageUp => Self::Up,
            KeyCode::KeyX | KeyCode::PageDown => Self::Down,
            KeyCode::KeyQ => Self::RollLeft,
            KeyCode::KeyE => Self::RollRight,
            KeyCode::Home => Self::Home,
            KeyCode::Escape => Self::Exit,
            KeyCode::KeyB => Self::CyclePreset,
            KeyCode::F9 => Self::LoseDevice,
            _ => return None,
        };
        Some(key)
    }
}

/// Input snapshot filled by the window layer and polled once per update.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    pressed: HashSet<Key>,
    pointer_delta: Vec2,
    pointer_mode: PointerMode,
    left_button: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_event(&mut self, key: Key, is_pressed: bool) {
        if is_pressed {
            if self.held.insert(key) {
                self.pressed.insert(key);
            }
        } else {
            self.held.remove(&key);
        }
    }

    pub fn pointer_moved(&mut self, dx: f64, dy: f64) {
        if self.pointer_mode == PointerMode::Relative {
            self.pointer_delta += Vec2::new(dx as f32, dy as f32);
        }
    }

    pub fn left_button_event(&mut self, is_pressed: bool) {
        self.left_button = is_pressed;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// True only on the update following the key going down.
    pub fn was_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn left_button(&self) -> bool {
        self.left_button
    }

    pub fn pointer_mode(&self) -> PointerMode {
        self.pointer_mode
    }

    pub fn set_pointer_mode(&mut self, mode: PointerMode) {
        if mode != self.pointer_mode {
            self.pointer_delta = Vec2::ZERO;
        }
        self.pointer_mode = mode;
    }

    pub fn camera_input(&self) -> CameraInput {
        CameraInput {
            pointer_delta: match self.pointer_mode {
                PointerMode::Relative => Some(self.pointer_delta),
                PointerMode::Absolute => None,
            },
            forward: self.is_held(Key::Forward),
            back: self.is_held(Key::Back),
            left: self.is_held(Key::Left),
            right: self.is_held(Key::Right),
            up: self.is_held(Key::Up),
            down: self.is_held(Key::Down),
            home: self.is_held(Key::Home),
        }
    }

    /// Clears per-update edges and the accumulated pointer delta.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.pointer_delta = Vec2::ZERO;
    }

    /// Forgets every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held.clear();
        self.pressed.clear();
        self.left_button = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_delta_only_accumulates_when_captured() {
        let mut input = InputState::new();
        input.pointer_moved(3.0, 4.0);
        assert_eq!(input.pointer_delta, Vec2::ZERO);
        assert_eq!(input.camera_input().pointer_delta, None);

        input.set_pointer_mode(PointerMode::Relative);
        input.pointer_moved(3.0, 4.0);
        input.pointer_moved(7.0, -1.0);
        assert_eq!(input.camera_input().pointer_delta, Some(Vec2::new(10.0, 3.0)));
    }

    #[test]
    fn pressed_edges_last_one_frame() {
        let mut input = InputState::new();
        input.key_event(Key::CyclePreset, true);
        assert!(input.was_pressed(Key::CyclePreset));
        input.end_frame();
        assert!(!input.was_pressed(Key::CyclePreset));
        assert!(input.is_held(Key::CyclePreset));

        // key repeat does not produce a new edge
        input.key_event(Key::CyclePreset, true);
        assert!(!input.was_pressed(Key::CyclePreset));
    }

    #[test]
    fn arrows_and_letters_share_keys() {
        assert_eq!(Key::from_key_code(KeyCode::KeyW), Some(Key::Forward));
        assert_eq!(Key::from_key_code(KeyCode::ArrowUp), Some(Key::Forward));
        assert_eq!(Key::from_key_code(KeyCode::PageDown), Some(Key::Down));
        assert_eq!(Key::from_key_code(KeyCode::KeyZ), None);
    }

    #[test]
    fn release_all_clears_held_keys() {
        let mut input = InputState::new();
        input.key_event(Key::Forward, true);
        input.left_button_event(true);
        input.release_all();
        assert!(!input.is_held(Key::Forward));
        assert!(!input.left_button());
    }
}
