//! Activity and duplicate-dispatch policies.
//!
//! The params file keeps these loosely typed for convenience (a bool, a
//! string, or an array for the activity filter; a plain string for the
//! duplicate rule); both are modeled as tagged variants internally.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Statuses treated as inactive by [`ActivityPolicy::BuiltinFilter`].
///
/// Terminal or paused board statuses; tickets sitting in one of these are
/// not worth calendar time.
const INACTIVE_STATUSES: &[&str] = &[
    "canceled",
    "cancelled",
    "closed",
    "completed",
    "on hold",
    "on-hold",
    "pending code review",
    "pending qa",
    "pending review",
    "waiting",
];

/// Which tickets count as active, and therefore eligible for dispatch.
///
/// `BuiltinFilter` is a deny-list while `AnyOf` is an allow-list. The
/// asymmetry is inherited from observed upstream behavior and is kept
/// deliberately.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ActivityPolicyRepr")]
pub enum ActivityPolicy {
    /// Inactive when the status is in the built-in terminal/paused list.
    BuiltinFilter,
    /// Every ticket is active.
    AllowAll,
    /// Active only when the status equals this value.
    Exactly(String),
    /// Active only when the status is a member of this set.
    AnyOf(BTreeSet<String>),
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        Self::BuiltinFilter
    }
}

impl ActivityPolicy {
    /// Applies the policy to a ticket's status name.
    ///
    /// Status comparison is done on the lower-cased name; configured
    /// statuses are expected lower-case.
    #[must_use]
    pub fn is_active(&self, status: &str) -> bool {
        let status = status.to_lowercase();
        match self {
            Self::BuiltinFilter => !INACTIVE_STATUSES.contains(&status.as_str()),
            Self::AllowAll => true,
            Self::Exactly(wanted) => status == *wanted,
            Self::AnyOf(allowed) => allowed.contains(status.as_str()),
        }
    }
}

/// The config-file shapes: `true`/`false`, a single status, or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ActivityPolicyRepr {
    Flag(bool),
    One(String),
    Many(BTreeSet<String>),
}

impl From<ActivityPolicyRepr> for ActivityPolicy {
    fn from(repr: ActivityPolicyRepr) -> Self {
        match repr {
            ActivityPolicyRepr::Flag(true) => Self::BuiltinFilter,
            ActivityPolicyRepr::Flag(false) => Self::AllowAll,
            ActivityPolicyRepr::One(status) => Self::Exactly(status),
            ActivityPolicyRepr::Many(statuses) => Self::AnyOf(statuses),
        }
    }
}

/// How to treat a ticket that already has hours on the calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Reduce the dispatchable hours by what is already committed.
    #[default]
    Subtract,
    /// Dispatch nothing if any hours are already committed.
    Skip,
    /// Re-dispatch in full.
    Ignore,
}

impl DuplicatePolicy {
    /// String form used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Subtract => "subtract",
            Self::Skip => "skip",
            Self::Ignore => "ignore",
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subtract" => Ok(Self::Subtract),
            "skip" => Ok(Self::Skip),
            "ignore" => Ok(Self::Ignore),
            other => Err(DispatchError::UnknownPolicy(other.to_string())),
        }
    }
}
