use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewableId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for ReviewableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReviewableId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ReviewableId)
    }
}

impl FromStr for TopicId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(TopicId)
    }
}

/// Header carrying the acting moderator's user id.
pub const MODERATOR_ID_HEADER: &str = "x-moderator-id";

/// Header carrying the acting moderator's username.
pub const MODERATOR_USERNAME_HEADER: &str = "x-moderator-username";

// ---------------------------------------------------------------------------
// ReviewableStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewableStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Ignored,
    Deleted,
}

impl ReviewableStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewableStatus::Pending => "pending",
            ReviewableStatus::Approved => "approved",
            ReviewableStatus::Rejected => "rejected",
            ReviewableStatus::Ignored => "ignored",
            ReviewableStatus::Deleted => "deleted",
        }
    }

    pub fn is_resolved(self) -> bool {
        self != ReviewableStatus::Pending
    }

    /// Status a server action moves a pending reviewable into.
    ///
    /// Matching is by prefix, so `approve_post` and `approve_user` both
    /// resolve to `Approved`.
    pub fn for_action(action: &str) -> Option<ReviewableStatus> {
        const TABLE: &[(&str, ReviewableStatus)] = &[
            ("approve", ReviewableStatus::Approved),
            ("revise_and_reject", ReviewableStatus::Rejected),
            ("reject", ReviewableStatus::Rejected),
            ("ignore", ReviewableStatus::Ignored),
            ("disagree", ReviewableStatus::Ignored),
            ("agree", ReviewableStatus::Approved),
            ("delete", ReviewableStatus::Deleted),
        ];
        TABLE
            .iter()
            .find(|(prefix, _)| action.starts_with(prefix))
            .map(|(_, status)| *status)
    }
}

impl fmt::Display for ReviewableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewableStatus {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewableStatus::Pending),
            "approved" => Ok(ReviewableStatus::Approved),
            "rejected" => Ok(ReviewableStatus::Rejected),
            "ignored" => Ok(ReviewableStatus::Ignored),
            "deleted" => Ok(ReviewableStatus::Deleted),
            _ => Err(crate::error::CoreError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ClaimMode
// ---------------------------------------------------------------------------

/// Site-wide policy for topic claiming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    Disabled,
    #[default]
    Optional,
    Required,
}

impl ClaimMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimMode::Disabled => "disabled",
            ClaimMode::Optional => "optional",
            ClaimMode::Required => "required",
        }
    }
}

impl fmt::Display for ClaimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimMode {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(ClaimMode::Disabled),
            "optional" => Ok(ClaimMode::Optional),
            "required" => Ok(ClaimMode::Required),
            _ => Err(crate::error::CoreError::InvalidClaimMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
