//! Terminal color palette and the shared color pool.
//!
//! The transform pipeline works on raw ANSI escape sequences, so the
//! palette is kept as literal code strings rather than a styling-library
//! abstraction. The pool hands out colors to registered participants;
//! two colors are reserved (red for the privileged participant, yellow
//! for the default human) and assigned colors leave the pool.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const YELLOW: &str = "\x1b[33m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const MAGENTA: &str = "\x1b[35m";
pub const BLUE: &str = "\x1b[34m";
pub const CYAN: &str = "\x1b[36m";
pub const WHITE: &str = "\x1b[37m";
pub const DIM: &str = "\x1b[2m";
/// Foreground reset (colorama `Fore.RESET`).
pub const RESET: &str = "\x1b[39m";
/// Full style reset (colorama `Style.RESET_ALL`).
pub const STYLE_RESET: &str = "\x1b[0m";

/// Watermark prefixed to assistant-generated messages.
pub const WATERMARK: &str = "\x1b[37m\u{25ba}\x1b[39m";
/// Watermark for assistant messages that requested a tool execution.
pub const EXEC_WATERMARK: &str = "\x1b[33m\u{25ba}\x1b[39m";

/// A nameable terminal color from the shared pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Yellow,
    Green,
    Red,
    Magenta,
    Blue,
    Cyan,
    White,
}

impl Color {
    /// The raw ANSI escape code for this color.
    pub fn code(&self) -> &'static str {
        match self {
            Color::Yellow => YELLOW,
            Color::Green => GREEN,
            Color::Red => RED,
            Color::Magenta => MAGENTA,
            Color::Blue => BLUE,
            Color::Cyan => CYAN,
            Color::White => WHITE,
        }
    }

    /// All pool colors in assignment order.
    pub fn all() -> [Color; 7] {
        [
            Color::Yellow,
            Color::Green,
            Color::Red,
            Color::Magenta,
            Color::Blue,
            Color::Cyan,
            Color::White,
        ]
    }

    /// Reverse lookup from an ANSI code to a pool color.
    pub fn from_code(code: &str) -> Option<Color> {
        Color::all().into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Yellow => write!(f, "yellow"),
            Color::Green => write!(f, "green"),
            Color::Red => write!(f, "red"),
            Color::Magenta => write!(f, "magenta"),
            Color::Blue => write!(f, "blue"),
            Color::Cyan => write!(f, "cyan"),
            Color::White => write!(f, "white"),
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yellow" => Ok(Color::Yellow),
            "green" => Ok(Color::Green),
            "red" => Ok(Color::Red),
            "magenta" => Ok(Color::Magenta),
            "blue" => Ok(Color::Blue),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),
            other => Err(format!("invalid color: '{other}'")),
        }
    }
}

/// Color reserved for the privileged (`sudo`) participant.
pub const SUDO_COLOR: Color = Color::Red;
/// Color reserved for the default human participant.
pub const USER_COLOR: Color = Color::Yellow;

/// Finite pool of assignable participant colors.
///
/// The reserved colors are removed up front; `take` hands the reserved
/// color straight back for the matching participant kind. Assignment is
/// deterministic (lowest remaining color first) so test runs are stable.
#[derive(Debug, Clone)]
pub struct ColorPool {
    available: BTreeSet<Color>,
}

impl ColorPool {
    pub fn new() -> Self {
        let mut available: BTreeSet<Color> = Color::all().into_iter().collect();
        available.remove(&SUDO_COLOR);
        available.remove(&USER_COLOR);
        Self { available }
    }

    /// Number of colors still assignable.
    pub fn remaining(&self) -> usize {
        self.available.len()
    }

    /// Take a specific color out of the pool, if still available.
    pub fn take(&mut self, preferred: Color) -> Option<Color> {
        self.available.take(&preferred)
    }

    /// Take the next free color. `None` when the pool is exhausted, in
    /// which case callers fall back to [`SUDO_COLOR`]'s code as default.
    pub fn take_next(&mut self) -> Option<Color> {
        let next = self.available.iter().next().copied()?;
        self.available.take(&next)
    }
}

impl Default for ColorPool {
    fn default() -> Self {
        Self::new()
    }
}
