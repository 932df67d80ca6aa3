//! Client input handling with edge-triggered view toggles

use macroquad::input::{is_key_down, KeyCode};
use shared::MoveCommand;

/// View toggles pressed this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggles {
    pub prediction: bool,
    pub interpolation: bool,
}

/// Maps the held movement keys to a command
///
/// Holding both directions, or neither, produces no command.
pub fn key_to_move(left: bool, right: bool) -> Option<MoveCommand> {
    match (left, right) {
        (true, false) => Some(MoveCommand::MoveLeft),
        (false, true) => Some(MoveCommand::MoveRight),
        _ => None,
    }
}

/// Samples the keyboard once per frame
pub struct InputManager {
    // Previous frame key states for edge detection
    prev_key_1: bool,
    prev_key_2: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            prev_key_1: false,
            prev_key_2: false,
        }
    }

    /// Returns the toggles pressed this frame and the move to send, if any
    ///
    /// A move is produced every frame a direction is held.
    pub fn update(&mut self) -> (Toggles, Option<MoveCommand>) {
        // Support both WASD and arrow keys
        let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
        let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);

        let toggles = self.detect_toggles(is_key_down(KeyCode::Key1), is_key_down(KeyCode::Key2));

        (toggles, key_to_move(left, right))
    }

    /// Reports keys that went down since the previous call
    pub fn detect_toggles(&mut self, key_1: bool, key_2: bool) -> Toggles {
        let toggles = Toggles {
            prediction: key_1 && !self.prev_key_1,
            interpolation: key_2 && !self.prev_key_2,
        };

        self.prev_key_1 = key_1;
        self.prev_key_2 = key_2;

        toggles
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
