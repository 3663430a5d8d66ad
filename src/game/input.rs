//! Input Capture and Normalization
//!
//! Maps raw player input (keys, words) onto the four slide directions and
//! the handful of non-move actions the controller understands.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use thiserror::Error;

// =============================================================================
// DIRECTION
// =============================================================================

/// Slide direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// Compact toward row 0
    Up = 0,
    /// Compact toward row `size-1`
    Down = 1,
    /// Compact toward column 0
    Left = 2,
    /// Compact toward column `size-1`
    Right = 3,
}

impl Direction {
    /// All directions, in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Left/right sweep along rows; up/down sweep along columns.
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    /// Left/up compact toward index 0.
    #[inline]
    pub fn is_ascending(self) -> bool {
        matches!(self, Direction::Left | Direction::Up)
    }

    /// The direction pointing the other way along the same axis.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Short name used in logs and replay dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" | "w" | "k" | "north" => Ok(Direction::Up),
            "down" | "s" | "j" | "south" => Ok(Direction::Down),
            "left" | "l" | "a" | "h" | "west" => Ok(Direction::Left),
            "right" | "r" | "d" | "east" => Ok(Direction::Right),
            other => Err(InputError::UnknownDirection(other.to_string())),
        }
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// One player action from the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputAction {
    /// Slide the board
    Move(Direction),
    /// Restore the previous board
    Undo,
    /// Place a 4 on a random empty cell
    ForceTile,
    /// Start over
    NewGame,
    /// Leave the game loop
    Quit,
}

impl FromStr for InputAction {
    type Err = InputError;

    /// Parse one token.
    ///
    /// Single keys follow the wasd layout (`u` is undo here, not up); longer
    /// words go through [`Direction::from_str`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "" => Err(InputError::Empty),
            "w" => Ok(InputAction::Move(Direction::Up)),
            "a" => Ok(InputAction::Move(Direction::Left)),
            "s" => Ok(InputAction::Move(Direction::Down)),
            "d" => Ok(InputAction::Move(Direction::Right)),
            "u" | "undo" | "z" => Ok(InputAction::Undo),
            "f" | "force" | "4" => Ok(InputAction::ForceTile),
            "n" | "new" => Ok(InputAction::NewGame),
            "q" | "quit" | "exit" => Ok(InputAction::Quit),
            other => other.parse::<Direction>().map(InputAction::Move),
        }
    }
}

/// Parse a line of input into actions.
///
/// Whitespace separated tokens are parsed one by one. A single token made
/// only of wasd keys (e.g. `aasd`) is expanded into one move per key.
pub fn parse_line(line: &str) -> Result<Vec<InputAction>, InputError> {
    let mut actions = Vec::new();

    for token in line.split_whitespace() {
        let is_key_run = token.len() > 1
            && token.chars().all(|c| matches!(c.to_ascii_lowercase(), 'w' | 'a' | 's' | 'd'));

        if is_key_run {
            for key in token.chars() {
                actions.push(key.to_string().parse()?);
            }
        } else {
            actions.push(token.parse()?);
        }
    }

    if actions.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(actions)
}

/// Input parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Nothing to parse.
    #[error("empty input")]
    Empty,

    /// Token did not name a direction or action.
    #[error("unknown direction or action: {0:?}")]
    UnknownDirection(String),
}

// =============================================================================
// TESTS
// =============================================================================
