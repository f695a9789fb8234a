use std::{cmp, fmt, str};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod loc;
pub mod oauth2;

mod entry;
mod error;
mod event;

pub use crate::config::Config;
pub use crate::entry::*;
pub use crate::error::*;
pub use crate::event::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    GoogleDrive,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::GoogleDrive => f.write_str("Google Drive"),
        }
    }
}

/// Which way data is allowed to flow during a synchronization
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Remote to local only
    Pull,
    /// Local to remote only
    Push,
    /// Pull phase first, then push phase
    #[default]
    Both,
}

impl Direction {
    pub fn pulls(self) -> bool {
        matches!(self, Direction::Pull | Direction::Both)
    }

    pub fn pushes(self) -> bool {
        matches!(self, Direction::Push | Direction::Both)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Pull => f.write_str("pull"),
            Direction::Push => f.write_str("push"),
            Direction::Both => f.write_str("both"),
        }
    }
}

impl str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pull" => Ok(Direction::Pull),
            "push" => Ok(Direction::Push),
            "both" => Ok(Direction::Both),
            _ => Err(Error::InvalidArgument(format!("unknown direction: {s}"))),
        }
    }
}

/// Granularity of the modification times offered by a storage.
///
/// Variants are ordered from the finest to the coarsest, so that
/// `cmp::max` of two precisions yields the one both sides can honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Precision {
    Nanosecond,
    Millisecond,
    Second,
    Day,
}

impl Precision {
    fn delta(self) -> TimeDelta {
        match self {
            Precision::Nanosecond => TimeDelta::nanoseconds(1),
            Precision::Millisecond => TimeDelta::milliseconds(1),
            Precision::Second => TimeDelta::seconds(1),
            Precision::Day => TimeDelta::days(1),
        }
    }

    /// Truncates `time` to this precision
    pub fn truncate(self, time: DateTime<Utc>) -> DateTime<Utc> {
        if self == Precision::Nanosecond {
            return time;
        }
        time.duration_trunc(self.delta()).unwrap_or(time)
    }
}

/// Compares two modification times at the coarser of both precisions.
/// Times that fall in the same precision slot compare `Equal`.
pub fn compare_mtime(
    lhs: DateTime<Utc>,
    lhs_prec: Precision,
    rhs: DateTime<Utc>,
    rhs_prec: Precision,
) -> cmp::Ordering {
    let prec = cmp::max(lhs_prec, rhs_prec);
    prec.truncate(lhs).cmp(&prec.truncate(rhs))
}
