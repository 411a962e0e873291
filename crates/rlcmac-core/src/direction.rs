use core::fmt;

use serde::{Deserialize, Serialize};

/// Link direction of a captured radio block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Direction {
    /// Uplink, mobile station to network
    Ul,
    /// Downlink, network to mobile station
    Dl,
}

impl Direction {
    #[inline]
    pub fn is_ul(&self) -> bool {
        matches!(self, Direction::Ul)
    }

    #[inline]
    pub fn is_dl(&self) -> bool {
        matches!(self, Direction::Dl)
    }

    /// Parses the short and long spellings accepted on command lines
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ul" | "uplink" => Some(Direction::Ul),
            "dl" | "downlink" => Some(Direction::Dl),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ul => write!(f, "UL"),
            Direction::Dl => write!(f, "DL"),
        }
    }
}
