use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const LEVEL_COUNT: u8 = 50;
pub const STAGES_PER_WORLD: u8 = 10;

/// Raised when a level string is not of the form `x-y`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid level '{input}': use the format `x-y`, where x is 1-5 and y is 1-10")]
pub struct LevelFormatError {
    pub input: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum World {
    Day,
    Night,
    Pool,
    Fog,
    Roof,
}

impl World {
    pub const ALL: [World; 5] = [World::Day, World::Night, World::Pool, World::Fog, World::Roof];

    /// Daytime worlds put mushrooms to sleep.
    pub fn is_daytime(self) -> bool {
        matches!(self, World::Day | World::Pool | World::Roof)
    }

    pub fn has_water(self) -> bool {
        matches!(self, World::Pool | World::Fog)
    }

    /// Background id the board uses for this world.
    pub fn background_id(self) -> u32 {
        match self {
            World::Day => 0,
            World::Night => 1,
            World::Pool => 2,
            World::Fog => 3,
            World::Roof => 4,
        }
    }
}

/// An adventure level, numbered 1..=50 in play order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const FIRST: Level = Level(1);
    pub const LAST: Level = Level(LEVEL_COUNT);

    pub fn new(number: u8) -> Option<Level> {
        (1..=LEVEL_COUNT).contains(&number).then_some(Level(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-level tables.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn world_number(self) -> u8 {
        self.0 / STAGES_PER_WORLD + u8::from(self.0 % STAGES_PER_WORLD > 0)
    }

    pub fn stage(self) -> u8 {
        match self.0 % STAGES_PER_WORLD {
            0 => STAGES_PER_WORLD,
            s => s,
        }
    }

    pub fn world(self) -> World {
        World::ALL[usize::from(self.world_number() - 1)]
    }

    pub fn next(self) -> Option<Level> {
        Level::new(self.0 + 1)
    }

    pub fn all() -> impl Iterator<Item = Level> {
        (1..=LEVEL_COUNT).map(Level)
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Level::new(value).ok_or_else(|| format!("level number {} is outside 1..=50", value))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.world_number(), self.stage())
    }
}

impl FromStr for Level {
    type Err = LevelFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LevelFormatError {
            input: s.to_string(),
        };

        let bytes = s.as_bytes();
        if !(3..=4).contains(&bytes.len()) {
            return Err(err());
        }
        if !(b'1'..=b'5').contains(&bytes[0]) || bytes[1] != b'-' {
            return Err(err());
        }
        if !(b'1'..=b'9').contains(&bytes[2]) {
            return Err(err());
        }
        if bytes.len() == 4 && &bytes[2..] != b"10" {
            return Err(err());
        }

        let world = bytes[0] - b'0';
        let stage = if bytes.len() == 4 { 10 } else { bytes[2] - b'0' };
        Ok(Level((world - 1) * STAGES_PER_WORLD + stage))
    }
}
