use thiserror::Error;

use crate::asset::{AssetKind, AssetRecord, Reviewable, Status};
use crate::review::ReviewDecision;

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("A reject reason is required when rejecting")]
    ReasonRequired,

    #[error("Review already decided for asset: {0}")]
    AlreadyDecided(String),

    #[error("Invalid weight: {0} (must be >= 0)")]
    InvalidWeight(i32),

    #[error("Invalid vote value: {0} (must be -1, 0 or 1)")]
    InvalidVoteValue(i32),

    #[error("Invalid score: {0} (must be within 0..=100)")]
    InvalidScore(f64),

    #[error("No contributing ratings for asset: {0}")]
    NoContributingRatings(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Asset already exists: {0}")]
    DuplicateAsset(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid review decision: {0}")]
    InvalidDecision(ReviewDecision),

    #[error("No pending review for asset: {0}")]
    NoPendingReview(String),

    #[error("Asset {id} is not a valid target (expected {expected})")]
    InvalidTarget { id: String, expected: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not in a viridian project. Run 'viridian init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .viridian/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GovernanceError {
    pub(crate) fn invalid_target(id: &str, expected: &[AssetKind]) -> Self {
        let expected = expected
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        GovernanceError::InvalidTarget {
            id: id.to_string(),
            expected,
        }
    }

    /// Validation errors are rejected before anything is written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GovernanceError::InvalidTransition { .. }
                | GovernanceError::ReasonRequired
                | GovernanceError::InvalidWeight(_)
                | GovernanceError::InvalidVoteValue(_)
                | GovernanceError::InvalidScore(_)
                | GovernanceError::InvalidDecision(_)
                | GovernanceError::InvalidTarget { .. }
                | GovernanceError::InvalidArgument(_)
        )
    }

    /// Only storage failures are worth retrying, and only by the host.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GovernanceError::StorageUnavailable(_))
    }
}

/// A failed operation together with the asset's current, unchanged record.
#[derive(Debug)]
pub struct Rejection {
    pub error: GovernanceError,
    pub current: Option<AssetRecord>,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.current {
            Some(record) => write!(
                f,
                "{} (current: {} {} is {})",
                self.error,
                record.kind(),
                record.id(),
                record.status()
            ),
            None => write!(f, "{}", self.error),
        }
    }
}

impl From<GovernanceError> for Rejection {
    fn from(error: GovernanceError) -> Self {
        Rejection {
            error,
            current: None,
        }
    }
}

impl std::error::Error for Rejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
