//! Merge-policy and match-strategy definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How remote metadata combines with local fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Every remote-supplied field overwrites the local field.
    Replace,
    /// A field is overwritten only if the local value is empty; tags are
    /// unioned instead of replaced.
    #[default]
    FillMissing,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Replace => write!(f, "replace"),
            MergePolicy::FillMissing => write!(f, "fillmissing"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(MergePolicy::Replace),
            "fillmissing" | "fill-missing" | "fill_missing" => Ok(MergePolicy::FillMissing),
            _ => Err(format!("Unknown merge policy: {}", s)),
        }
    }
}

/// How a multi-candidate hash match is disambiguated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Always take the first candidate.
    FirstHit,
    /// Defer to the decision collaborator; blocks the current session item
    /// until a choice (or a decline) arrives.
    #[default]
    Defer,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::FirstHit => write!(f, "firsthit"),
            MatchStrategy::Defer => write!(f, "defer"),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "firsthit" | "first-hit" | "first_hit" => Ok(MatchStrategy::FirstHit),
            "defer" => Ok(MatchStrategy::Defer),
            _ => Err(format!("Unknown match strategy: {}", s)),
        }
    }
}
