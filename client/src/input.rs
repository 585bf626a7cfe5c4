//! Keyboard sampling into per-tick input state

use macroquad::prelude::*;

/// Held controls for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub shoot: bool,
}

/// One-shot actions triggered on key press rather than while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actions {
    pub spawn: bool,
    pub restart: bool,
}

pub struct InputManager {
    current_input: InputState,

    // Previous frame key states for edge detection
    prev_key_enter: bool,
    prev_key_r: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            current_input: InputState::default(),
            prev_key_enter: false,
            prev_key_r: false,
        }
    }

    /// Samples the keyboard. Movement supports both WASD and arrow keys.
    pub fn update(&mut self) -> (InputState, Actions) {
        self.current_input = InputState {
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            up: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            shoot: is_key_down(KeyCode::Space),
        };

        let key_enter = is_key_down(KeyCode::Enter);
        let key_r = is_key_down(KeyCode::R);

        let actions = Actions {
            spawn: key_enter && !self.prev_key_enter,
            restart: key_r && !self.prev_key_r,
        };

        self.prev_key_enter = key_enter;
        self.prev_key_r = key_r;

        (self.current_input, actions)
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
