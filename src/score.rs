//! Weighted-mean score aggregation.
//!
//! Aggregation is a pure function of the contributing ratings: the engine
//! recomputes from the full rating set on every trigger instead of keeping
//! running totals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::asset::Rating;
use crate::error::{GovernanceError, Result};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// A composite score and the totals it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    pub total_weight: i64,
    pub rating_count: usize,
}

/// One rating's share of an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub rating_id: String,
    pub score: f64,
    pub weight: i64,
}

pub fn validate_score(score: f64) -> Result<()> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(GovernanceError::InvalidScore(score));
    }
    Ok(())
}

pub fn validate_weight(weight: i32) -> Result<()> {
    if weight < 0 {
        return Err(GovernanceError::InvalidWeight(weight));
    }
    Ok(())
}

/// Rating weight after community votes, floored at `min_rating_weight`.
pub fn effective_weight(weight: i32, net_votes: i64, min_rating_weight: i32) -> i64 {
    (i64::from(weight) + net_votes).max(i64::from(min_rating_weight.max(0)))
}

/// Select the active ratings and weigh them.
///
/// `net_votes` maps rating ids to their current net vote total; ratings
/// without votes are looked up as zero.
pub fn contributions(
    ratings: &[Rating],
    net_votes: &HashMap<String, i64>,
    min_rating_weight: i32,
) -> Vec<Contribution> {
    let mut out: Vec<Contribution> = ratings
        .iter()
        .filter(|r| r.is_contributing())
        .map(|r| {
            let votes = net_votes.get(&r.envelope.id).copied().unwrap_or(0);
            Contribution {
                rating_id: r.envelope.id.clone(),
                score: r.score,
                weight: effective_weight(r.weight, votes, min_rating_weight),
            }
        })
        .collect();

    // Fixed summation order keeps the float result reproducible.
    out.sort_by(|a, b| a.rating_id.cmp(&b.rating_id));
    out
}

/// Weighted mean of the contributions.
///
/// Fails with `NoContributingRatings` when the total weight is zero, which
/// callers treat as "unscored".
pub fn aggregate(asset_id: &str, contributions: &[Contribution]) -> Result<Score> {
    let total_weight: i64 = contributions.iter().map(|c| c.weight).sum();
    if total_weight <= 0 {
        return Err(GovernanceError::NoContributingRatings(asset_id.to_string()));
    }

    let weighted: f64 = contributions
        .iter()
        .map(|c| c.score * c.weight as f64)
        .sum();

    Ok(Score {
        value: weighted / total_weight as f64,
        total_weight,
        rating_count: contributions.iter().filter(|c| c.weight > 0).count(),
    })
}

/// Aggregate into an optional score, mapping "no contributing ratings" to `None`.
pub fn score_or_unscored(asset_id: &str, contributions: &[Contribution]) -> Result<Option<Score>> {
    match aggregate(asset_id, contributions) {
        Ok(score) => Ok(Some(score)),
        Err(GovernanceError::NoContributingRatings(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Status;

    fn active(score: f64, weight: i32) -> Rating {
        let mut rating = Rating::new("p1".to_string(), score, weight, None);
        rating.envelope.status = Status::Active;
        rating
    }

    #[test]
    fn test_weighted_mean() {
        let ratings = vec![active(80.0, 2), active(60.0, 1), active(40.0, 1)];
        let c = contributions(&ratings, &HashMap::new(), 0);
        let score = aggregate("p1", &c).unwrap();

        assert_eq!(score.value, 65.0);
        assert_eq!(score.total_weight, 4);
        assert_eq!(score.rating_count, 3);
    }

    #[test]
    fn test_non_active_ratings_are_excluded() {
        let mut ratings = vec![active(80.0, 1)];
        for status in [Status::Preliminary, Status::Rejected, Status::Deleted, Status::Outdated] {
            let mut r = active(0.0, 10);
            r.envelope.status = status;
            ratings.push(r);
        }

        let c = contributions(&ratings, &HashMap::new(), 0);
        assert_eq!(c.len(), 1);
        assert_eq!(aggregate("p1", &c).unwrap().value, 80.0);
    }

    #[test]
    fn test_zero_weight_is_unscored() {
        let ratings = vec![active(80.0, 0), active(20.0, 0)];
        let c = contributions(&ratings, &HashMap::new(), 0);

        assert!(matches!(
            aggregate("p1", &c),
            Err(GovernanceError::NoContributingRatings(id)) if id == "p1"
        ));
        assert_eq!(score_or_unscored("p1", &c).unwrap(), None);
        assert_eq!(score_or_unscored("p1", &[]).unwrap(), None);
    }

    #[test]
    fn test_aggregate_is_deterministic_regardless_of_order() {
        let ratings = vec![active(33.3, 3), active(71.9, 7), active(12.1, 1), active(99.0, 5)];
        let mut reversed = ratings.clone();
        reversed.reverse();

        let a = aggregate("p1", &contributions(&ratings, &HashMap::new(), 0)).unwrap();
        let b = aggregate("p1", &contributions(&reversed, &HashMap::new(), 0)).unwrap();
        let c = aggregate("p1", &contributions(&ratings, &HashMap::new(), 0)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_adding_a_rating_moves_toward_it() {
        let ratings = vec![active(80.0, 2), active(60.0, 1), active(40.0, 1)];
        let before = aggregate("p1", &contributions(&ratings, &HashMap::new(), 0))
            .unwrap()
            .value;

        for (score, weight) in [(90.0, 1), (10.0, 3), (65.0, 2)] {
            let mut more = ratings.clone();
            more.push(active(score, weight));
            let after = aggregate("p1", &contributions(&more, &HashMap::new(), 0))
                .unwrap()
                .value;

            assert!((after - before).abs() <= (score - before).abs());
            assert!((after - before) * (score - before) >= 0.0);
        }
    }

    #[test]
    fn test_votes_adjust_weight() {
        let up = active(100.0, 1);
        let down = active(0.0, 1);
        let mut votes = HashMap::new();
        votes.insert(up.envelope.id.clone(), 2);
        votes.insert(down.envelope.id.clone(), -5);

        let c = contributions(&[up, down], &votes, 0);
        let score = aggregate("p1", &c).unwrap();

        // the down-voted rating drops to zero weight
        assert_eq!(score.value, 100.0);
        assert_eq!(score.total_weight, 3);
        assert_eq!(score.rating_count, 1);
    }

    #[test]
    fn test_effective_weight_floor() {
        assert_eq!(effective_weight(3, -10, 0), 0);
        assert_eq!(effective_weight(3, -10, 1), 1);
        assert_eq!(effective_weight(3, 2, 1), 5);
        assert_eq!(effective_weight(0, 0, -4), 0);
    }

    #[test]
    fn test_validation() {
        assert!(validate_weight(0).is_ok());
        assert!(matches!(validate_weight(-1), Err(GovernanceError::InvalidWeight(-1))));
        assert!(validate_score(0.0).is_ok());
        assert!(validate_score(100.0).is_ok());
        assert!(validate_score(100.5).is_err());
        assert!(validate_score(f64::NAN).is_err());
    }
}
