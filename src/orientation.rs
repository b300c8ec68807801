//! # Rotation
//!
//! xrandr names four rotations of an output. `left` and `right` turn the
//! picture by 90 degrees, which swaps the width and height of the
//! virtual screen area relative to the physical mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// Zero degree rotation.
    #[default]
    Normal,
    /// 90 degree counter clockwise; screen "up" will be on the left side.
    Left,
    /// 180 degree rotation; screen will be flipped.
    Inverted,
    /// 90 degree clockwise; screen "up" will be on the right.
    Right,
}

impl Rotation {
    /// The keyword xrandr prints and accepts for `--rotate`.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Normal => "normal",
            Self::Left => "left",
            Self::Inverted => "inverted",
            Self::Right => "right",
        }
    }

    /// Convert to clockwise degrees.
    pub fn to_degrees(&self) -> u16 {
        match *self {
            Self::Normal => 0,
            Self::Right => 90,
            Self::Inverted => 180,
            Self::Left => 270,
        }
    }

    /// Whether width and height trade places under this rotation.
    pub fn swaps_axes(&self) -> bool {
        self.to_degrees() % 180 == 90
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "left" => Ok(Self::Left),
            "inverted" => Ok(Self::Inverted),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown rotation '{}'", other)),
        }
    }
}
