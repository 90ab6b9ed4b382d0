//! Moderation verdict records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::Status;
use crate::error::{GovernanceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    #[default]
    Pending,
    Approved,
    Rejected,
    Ignored,
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewDecision::Pending => write!(f, "pending"),
            ReviewDecision::Approved => write!(f, "approved"),
            ReviewDecision::Rejected => write!(f, "rejected"),
            ReviewDecision::Ignored => write!(f, "ignored"),
        }
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReviewDecision::Pending),
            "approved" | "approve" => Ok(ReviewDecision::Approved),
            "rejected" | "reject" => Ok(ReviewDecision::Rejected),
            "ignored" | "ignore" => Ok(ReviewDecision::Ignored),
            _ => Err(format!("Invalid review decision: {}", s)),
        }
    }
}

/// Why a submission was rejected. Unrelated to [`Status`] and to
/// [`crate::voting::FlagReason`] despite the overlapping names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Inappropriate,
    Incorrect,
    Outdated,
    Duplicate,
    MissingSrc,
    Other,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Inappropriate => write!(f, "inappropriate"),
            RejectReason::Incorrect => write!(f, "incorrect"),
            RejectReason::Outdated => write!(f, "outdated"),
            RejectReason::Duplicate => write!(f, "duplicate"),
            RejectReason::MissingSrc => write!(f, "missing_src"),
            RejectReason::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for RejectReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "inappropriate" => Ok(RejectReason::Inappropriate),
            "incorrect" => Ok(RejectReason::Incorrect),
            "outdated" => Ok(RejectReason::Outdated),
            "duplicate" => Ok(RejectReason::Duplicate),
            "missing_src" | "missing_source" => Ok(RejectReason::MissingSrc),
            "other" => Ok(RejectReason::Other),
            _ => Err(format!("Invalid reject reason: {}", s)),
        }
    }
}

/// A moderation request and, once decided, its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub asset_id: String,
    pub requested_at: DateTime<Utc>,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub reject_reason: Option<RejectReason>,
    #[serde(default)]
    pub reason_comment: Option<String>,
}

impl Review {
    /// Open a pending review for `asset_id`.
    pub fn open(asset_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            asset_id: asset_id.to_string(),
            requested_at: at,
            decision: ReviewDecision::Pending,
            decided_at: None,
            reviewer: None,
            reject_reason: None,
            reason_comment: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.decision == ReviewDecision::Pending
    }

    /// Return the decided copy of this review. The reject reason is only
    /// kept for rejections.
    pub fn decide(&self, verdict: &Verdict, at: DateTime<Utc>) -> Result<Review> {
        verdict.validate()?;
        if !self.is_open() {
            return Err(GovernanceError::AlreadyDecided(self.asset_id.clone()));
        }

        let mut decided = self.clone();
        decided.decision = verdict.decision;
        decided.decided_at = Some(at);
        decided.reviewer = verdict.reviewer.clone();
        decided.reject_reason = match verdict.decision {
            ReviewDecision::Rejected => verdict.reject_reason,
            _ => None,
        };
        decided.reason_comment = verdict.comment.clone();
        Ok(decided)
    }
}

/// A reviewer's input to `submit_review`.
#[derive(Debug, Clone, Default)]
pub struct Verdict {
    pub decision: ReviewDecision,
    pub reject_reason: Option<RejectReason>,
    pub comment: Option<String>,
    pub reviewer: Option<String>,
}

impl Verdict {
    pub fn approve() -> Self {
        Self {
            decision: ReviewDecision::Approved,
            ..Self::default()
        }
    }

    pub fn reject(reason: RejectReason) -> Self {
        Self {
            decision: ReviewDecision::Rejected,
            reject_reason: Some(reason),
            ..Self::default()
        }
    }

    pub fn ignore() -> Self {
        Self {
            decision: ReviewDecision::Ignored,
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn by(mut self, reviewer: impl Into<String>) -> Self {
        self.reviewer = Some(reviewer.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.decision {
            ReviewDecision::Pending => Err(GovernanceError::InvalidDecision(self.decision)),
            ReviewDecision::Rejected if self.reject_reason.is_none() => {
                Err(GovernanceError::ReasonRequired)
            }
            _ => Ok(()),
        }
    }

    /// Status the asset moves to when this verdict is applied to a
    /// preliminary asset.
    pub fn target_status(&self) -> Status {
        match self.decision {
            ReviewDecision::Approved => Status::Active,
            ReviewDecision::Rejected => Status::Rejected,
            ReviewDecision::Pending | ReviewDecision::Ignored => Status::Preliminary,
        }
    }
}
