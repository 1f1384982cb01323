//! Backlog item lifecycle states.
//!
//! The set of statuses is closed: an item is always flying, at the gate, in the hangar or
//! landed. Items store the status [`name`](BacklogItemStatus::name); the one-letter
//! [`code`](BacklogItemStatus::code) is the short form accepted on the command line.

use crate::error::BacklogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacklogItemStatus {
    /// Work in progress.
    Flying,
    /// Ready to be picked up next.
    Gate,
    /// Accepted into the backlog but not planned.
    Hangar,
    /// Done.
    Landed,
}

impl BacklogItemStatus {
    /// Every status in canonical display order.
    pub const ALL: [BacklogItemStatus; 4] = [Self::Flying, Self::Gate, Self::Hangar, Self::Landed];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Flying => "f",
            Self::Gate => "g",
            Self::Hangar => "h",
            Self::Landed => "l",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Flying => "flying",
            Self::Gate => "gate",
            Self::Hangar => "hangar",
            Self::Landed => "landed",
        }
    }

    /// Heading used for this status' group in an overview.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Flying => "In flight",
            Self::Gate => "At the gate",
            Self::Hangar => "In the hangar",
            Self::Landed => "Landed",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.code().eq_ignore_ascii_case(code))
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for BacklogItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BacklogItemStatus {
    type Err = BacklogError;

    /// Accepts either the name or the one-letter code, ignoring case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_name(value)
            .or_else(|| Self::from_code(value))
            .ok_or_else(|| BacklogError::InvalidInput(format!("unknown status: {value}")))
    }
}
