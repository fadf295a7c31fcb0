//! Line-based input mapping
//!
//! Raw terminal capture lives outside this crate. Whatever front end is used
//! feeds one line per key press (`w`/`a`/`s`/`d`, arrow names, or `q`) and
//! gets back the command to send.

use shared::{Command, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Move(Direction),
    Quit,
}

/// Maps one input line to an action. Unknown input yields None.
pub fn parse_input(line: &str) -> Option<InputAction> {
    let action = match line.trim().to_ascii_lowercase().as_str() {
        "w" | "up" | "k" => InputAction::Move(Direction::Up),
        "s" | "down" | "j" => InputAction::Move(Direction::Down),
        "a" | "left" | "h" => InputAction::Move(Direction::Left),
        "d" | "right" | "l" => InputAction::Move(Direction::Right),
        "q" | "quit" => InputAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Turns actions into commands, skipping moves that would not change
/// anything on the server.
#[derive(Debug, Default)]
pub struct InputManager {
    commands_sent: u64,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command to send for `slot`, or None if nothing needs sending. A move
    /// along the snake's current `heading` is already in effect and skipped.
    pub fn command_for(
        &mut self,
        action: InputAction,
        slot: Option<usize>,
        heading: Option<Direction>,
    ) -> Option<Command> {
        let command = match action {
            InputAction::Quit => Command::Quit {
                claimed_slot: slot.map(|slot| slot as i64),
            },
            InputAction::Move(direction) => {
                let slot = slot?;
                if heading == Some(direction) {
                    return None;
                }
                Command::Move {
                    claimed_slot: slot as i64,
                    direction,
                }
            }
        };
        self.commands_sent += 1;
        Some(command)
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(parse_input("w"), Some(InputAction::Move(Direction::Up)));
        assert_eq!(parse_input(" D \n"), Some(InputAction::Move(Direction::Right)));
        assert_eq!(parse_input("left"), Some(InputAction::Move(Direction::Left)));
        assert_eq!(parse_input("q"), Some(InputAction::Quit));
        assert_eq!(parse_input("x"), None);
        assert_eq!(parse_input(""), None);
    }

    #[test]
    fn test_moves_need_a_slot() {
        let mut input = InputManager::new();
        assert!(input
            .command_for(InputAction::Move(Direction::Up), None, None)
            .is_none());
        assert_eq!(
            input.command_for(InputAction::Move(Direction::Up), Some(2), None),
            Some(Command::Move {
                claimed_slot: 2,
                direction: Direction::Up
            })
        );
        assert_eq!(input.commands_sent(), 1);
    }

    #[test]
    fn test_current_heading_is_not_resent() {
        let mut input = InputManager::new();
        assert!(input
            .command_for(InputAction::Move(Direction::Left), Some(0), Some(Direction::Left))
            .is_none());
        assert!(input
            .command_for(InputAction::Move(Direction::Down), Some(0), Some(Direction::Left))
            .is_some());
    }

    #[test]
    fn test_quit_without_slot() {
        let mut input = InputManager::new();
        assert_eq!(
            input.command_for(InputAction::Quit, None, None),
            Some(Command::Quit { claimed_slot: None })
        );
    }
}
