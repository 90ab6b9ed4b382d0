//! Reputation feedback hooks.
//!
//! The engine reports review outcomes and vote movements on a user's
//! submissions; a [`ReputationPolicy`] turns them into reputation deltas.

use serde::{Deserialize, Serialize};

use crate::asset::AssetKind;
use crate::review::ReviewDecision;

pub trait ReputationPolicy: Send + Sync {
    /// Delta for the submitter when a review of their asset is decided.
    fn on_review(&self, kind: AssetKind, decision: ReviewDecision) -> i32;

    /// Delta for the author when net votes on their asset move from
    /// `before` to `after`.
    fn on_votes(&self, kind: AssetKind, before: i64, after: i64) -> i32;
}

/// Table-driven policy, configurable from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationTable {
    pub approved: i32,
    pub rejected: i32,
    /// Net votes per reward step
    pub vote_step: i64,
    pub vote_step_reward: i32,
}

impl Default for ReputationTable {
    fn default() -> Self {
        Self {
            approved: 1,
            rejected: -2,
            vote_step: 5,
            vote_step_reward: 1,
        }
    }
}

impl ReputationPolicy for ReputationTable {
    fn on_review(&self, _kind: AssetKind, decision: ReviewDecision) -> i32 {
        match decision {
            ReviewDecision::Approved => self.approved,
            ReviewDecision::Rejected => self.rejected,
            ReviewDecision::Pending | ReviewDecision::Ignored => 0,
        }
    }

    /// Every `vote_step` net votes away from zero counts one step, in either
    /// direction. Moving up a step earns the reward, moving down costs it, so
    /// -1..=-4 costs nothing and -5 costs one reward.
    fn on_votes(&self, _kind: AssetKind, before: i64, after: i64) -> i32 {
        if self.vote_step <= 0 {
            return 0;
        }
        // truncating division keeps the steps symmetric around zero
        let steps = after / self.vote_step - before / self.vote_step;
        let delta = steps.saturating_mul(i64::from(self.vote_step_reward));
        delta.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

/// A policy that never changes reputation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReputation;

impl ReputationPolicy for NoReputation {
    fn on_review(&self, _kind: AssetKind, _decision: ReviewDecision) -> i32 {
        0
    }

    fn on_votes(&self, _kind: AssetKind, _before: i64, _after: i64) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_deltas() {
        let table = ReputationTable::default();
        assert_eq!(table.on_review(AssetKind::Rating, ReviewDecision::Approved), 1);
        assert_eq!(table.on_review(AssetKind::Rating, ReviewDecision::Rejected), -2);
        assert_eq!(table.on_review(AssetKind::Rating, ReviewDecision::Ignored), 0);
    }

    #[test]
    fn test_vote_steps() {
        let table = ReputationTable::default();
        assert_eq!(table.on_votes(AssetKind::Comment, 4, 5), 1);
        assert_eq!(table.on_votes(AssetKind::Comment, 5, 4), -1);
        assert_eq!(table.on_votes(AssetKind::Comment, 1, 4), 0);
        assert_eq!(table.on_votes(AssetKind::Comment, 0, 12), 2);
        // down-votes mirror up-votes around zero
        assert_eq!(table.on_votes(AssetKind::Comment, 0, -1), 0);
        assert_eq!(table.on_votes(AssetKind::Comment, 0, -4), 0);
        assert_eq!(table.on_votes(AssetKind::Comment, -4, -5), -1);
        assert_eq!(table.on_votes(AssetKind::Comment, -5, -4), 1);
        assert_eq!(table.on_votes(AssetKind::Comment, 6, -6), -2);
    }

    #[test]
    fn test_flip_flopping_votes_nets_zero() {
        let table = ReputationTable::default();
        let up = table.on_votes(AssetKind::Information, 4, 5);
        let down = table.on_votes(AssetKind::Information, 5, 4);
        assert_eq!(up + down, 0);
    }

    #[test]
    fn test_disabled_step() {
        let table = ReputationTable {
            vote_step: 0,
            ..ReputationTable::default()
        };
        assert_eq!(table.on_votes(AssetKind::Rating, 0, 100), 0);
    }
}
