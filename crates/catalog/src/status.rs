use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Custody state of a catalog record.
///
/// Declaration order doubles as the sort order when listing by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    OnShelf,
    Borrowed,
    Returned,
    Damaged,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::OnShelf,
        Status::Borrowed,
        Status::Returned,
        Status::Damaged,
    ];

    /// States from which a record may move into `self`.
    ///
    /// A state never appears in its own predecessor set, so self-transitions
    /// are always rejected.
    pub const fn allowed_from(self) -> &'static [Status] {
        match self {
            Status::OnShelf => &[Status::Returned, Status::Damaged],
            Status::Borrowed => &[Status::OnShelf],
            Status::Returned => &[Status::Borrowed],
            Status::Damaged => &[Status::OnShelf, Status::Returned],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::OnShelf => "on_shelf",
            Status::Borrowed => "borrowed",
            Status::Returned => "returned",
            Status::Damaged => "damaged",
        }
    }
}

/// Decide whether a record in `current` may be moved to `requested`.
pub fn is_valid_transition(current: Status, requested: Status) -> bool {
    requested.allowed_from().contains(&current)
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'; expected on_shelf/borrowed/returned/damaged")]
pub struct ParseStatusError(String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "on_shelf" | "onshelf" => Ok(Status::OnShelf),
            "borrowed" => Ok(Status::Borrowed),
            "returned" => Ok(Status::Returned),
            "damaged" => Ok(Status::Damaged),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}
