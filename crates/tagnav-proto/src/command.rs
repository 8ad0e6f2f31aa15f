use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed vocabulary of guidance hints sent to the pilot.
///
/// Axis naming is world-frame: `MovePositiveX` means "increase x".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    MovePositiveX,
    MoveNegativeX,
    MovePositiveY,
    MoveNegativeY,
    Ascend,
    Descend,
    NoSignal,
    Arrived,
    Complete,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::MovePositiveX,
        Command::MoveNegativeX,
        Command::MovePositiveY,
        Command::MoveNegativeY,
        Command::Ascend,
        Command::Descend,
        Command::NoSignal,
        Command::Arrived,
        Command::Complete,
    ];

    /// Wire keyword, also what `replay` prints.
    pub fn keyword(self) -> &'static str {
        match self {
            Command::MovePositiveX => "move-positive-x",
            Command::MoveNegativeX => "move-negative-x",
            Command::MovePositiveY => "move-positive-y",
            Command::MoveNegativeY => "move-negative-y",
            Command::Ascend => "ascend",
            Command::Descend => "descend",
            Command::NoSignal => "no-signal",
            Command::Arrived => "arrived",
            Command::Complete => "complete",
        }
    }

    /// Base name of the pre-rendered clip (without extension).
    pub fn clip(self) -> &'static str {
        match self {
            Command::MovePositiveX => "right",
            Command::MoveNegativeX => "left",
            Command::MovePositiveY => "forward",
            Command::MoveNegativeY => "backward",
            Command::Ascend => "up",
            Command::Descend => "down",
            Command::NoSignal => "none",
            Command::Arrived => "reached",
            Command::Complete => "success",
        }
    }

    /// Spoken phrase the clip was rendered from.
    pub fn phrase(self) -> &'static str {
        match self {
            Command::MovePositiveX => "move right",
            Command::MoveNegativeX => "move left",
            Command::MovePositiveY => "move forward",
            Command::MoveNegativeY => "move backward",
            Command::Ascend => "move up",
            Command::Descend => "move down",
            Command::NoSignal => "no april tag, move around",
            Command::Arrived => "reached destination",
            Command::Complete => "navigation complete",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
