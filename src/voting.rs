//! Community votes and flags.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::AssetKind;
use crate::error::{GovernanceError, Result};

/// What a vote is cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Rating,
    Information,
    Comment,
}

impl VoteKind {
    /// The vote kind for assets of `kind`, if they can be voted on.
    pub fn for_kind(kind: AssetKind) -> Option<VoteKind> {
        match kind {
            AssetKind::Rating => Some(VoteKind::Rating),
            AssetKind::Information => Some(VoteKind::Information),
            AssetKind::Comment => Some(VoteKind::Comment),
            _ => None,
        }
    }

    pub fn target_kind(self) -> AssetKind {
        match self {
            VoteKind::Rating => AssetKind::Rating,
            VoteKind::Information => AssetKind::Information,
            VoteKind::Comment => AssetKind::Comment,
        }
    }
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteKind::Rating => write!(f, "rating"),
            VoteKind::Information => write!(f, "information"),
            VoteKind::Comment => write!(f, "comment"),
        }
    }
}

impl std::str::FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rating" | "rate" => Ok(VoteKind::Rating),
            "information" | "info" => Ok(VoteKind::Information),
            "comment" => Ok(VoteKind::Comment),
            _ => Err(format!("Invalid vote kind: {}", s)),
        }
    }
}

/// One voter's current vote on one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub voter_id: String,
    pub target_id: String,
    pub kind: VoteKind,
    /// -1, 0 (cleared) or +1
    pub value: i8,
}

impl Vote {
    pub fn new(voter_id: &str, target_id: &str, kind: VoteKind, value: i8, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: at,
            voter_id: voter_id.to_string(),
            target_id: target_id.to_string(),
            kind,
            value,
        }
    }

    /// Key of the (voter, target) pair; at most one vote exists per key.
    pub fn composite_key(&self) -> String {
        vote_key(&self.voter_id, &self.target_id)
    }
}

pub fn vote_key(voter_id: &str, target_id: &str) -> String {
    format!("{}:{}", voter_id, target_id)
}

pub fn validate_vote_value(value: i32) -> Result<i8> {
    match value {
        -1..=1 => Ok(value as i8),
        _ => Err(GovernanceError::InvalidVoteValue(value)),
    }
}

/// Merge an incoming vote with the stored one for the same pair.
///
/// The stored vote's id is reused. A write older than the stored vote loses
/// (last write wins on timestamp).
pub fn supersede(existing: Option<&Vote>, incoming: Vote) -> Vote {
    match existing {
        Some(current) if current.timestamp > incoming.timestamp => current.clone(),
        Some(current) => Vote {
            id: current.id.clone(),
            ..incoming
        },
        None => incoming,
    }
}

pub fn net_votes(votes: &[Vote]) -> i64 {
    votes.iter().map(|v| i64::from(v.value)).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagReason {
    Inappropriate,
    Incorrect,
    Outdated,
    Trivial,
    Other,
}

impl std::fmt::Display for FlagReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagReason::Inappropriate => write!(f, "inappropriate"),
            FlagReason::Incorrect => write!(f, "incorrect"),
            FlagReason::Outdated => write!(f, "outdated"),
            FlagReason::Trivial => write!(f, "trivial"),
            FlagReason::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for FlagReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inappropriate" => Ok(FlagReason::Inappropriate),
            "incorrect" => Ok(FlagReason::Incorrect),
            "outdated" => Ok(FlagReason::Outdated),
            "trivial" => Ok(FlagReason::Trivial),
            "other" => Ok(FlagReason::Other),
            _ => Err(format!("Invalid flag reason: {}", s)),
        }
    }
}

/// Per-reason flag counters for a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    #[serde(default)]
    pub counts: BTreeMap<FlagReason, u32>,
    /// Total at the last approval; older flags no longer count.
    #[serde(default)]
    pub acknowledged: u32,
}

impl Flag {
    pub fn raise(&mut self, reason: FlagReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    pub fn count(&self, reason: FlagReason) -> u32 {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Flags raised since the last approval.
    pub fn pending(&self) -> u32 {
        self.total().saturating_sub(self.acknowledged)
    }

    pub fn acknowledge(&mut self) {
        self.acknowledged = self.total();
    }

    pub fn exceeds(&self, threshold: u32) -> bool {
        self.pending() > threshold
    }
}
