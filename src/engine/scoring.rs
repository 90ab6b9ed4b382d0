use std::collections::HashMap;

use super::Engine;
use crate::asset::{AssetKind, AssetRecord, Rating, Reviewable, Status};
use crate::error::{GovernanceError, Result};
use crate::events::GovernanceEvent;
use crate::score::{aggregate, contributions, score_or_unscored, validate_weight, Contribution, Score};
use crate::storage::AssetStore;
use crate::voting::net_votes;

impl<S: AssetStore> Engine<S> {
    /// Recompute and store the composite score of a product, producer or
    /// label from its active ratings.
    ///
    /// Returns `None` when nothing contributes; the stored score is cleared
    /// in that case.
    pub fn recompute(&self, asset_id: &str) -> Result<Option<Score>> {
        self.locks.with(asset_id, || self.recompute_locked(asset_id))
    }

    /// Current aggregate without touching the stored record.
    pub fn score(&self, asset_id: &str) -> Result<Score> {
        let asset = self.load(asset_id)?;
        let contributions = self.contributions_for(&asset)?;
        aggregate(asset_id, &contributions)
    }

    fn recompute_locked(&self, asset_id: &str) -> Result<Option<Score>> {
        let mut asset = self.load(asset_id)?;
        let contributions = self.contributions_for(&asset)?;
        let score = score_or_unscored(asset_id, &contributions)?;

        if asset.score() != score.as_ref() {
            asset.set_score(score.clone());
            self.store.put(&asset)?;
        }

        self.emit(GovernanceEvent::ScoreRecomputed {
            asset_id: asset_id.to_string(),
            score: score.clone(),
        });
        Ok(score)
    }

    fn contributions_for(&self, asset: &AssetRecord) -> Result<Vec<Contribution>> {
        if !asset.kind().is_scorable() {
            return Err(GovernanceError::invalid_target(
                asset.id(),
                &AssetKind::SCORABLE,
            ));
        }

        let ratings = self.store.query_ratings_for(asset.id())?;
        let mut votes = HashMap::new();
        for rating in ratings.iter().filter(|r| r.is_contributing()) {
            let net = net_votes(&self.store.votes_for(&rating.envelope.id)?);
            if net != 0 {
                votes.insert(rating.envelope.id.clone(), net);
            }
        }
        Ok(contributions(&ratings, &votes, self.config.min_rating_weight))
    }

    /// Change a rating's author weight, recomputing its target if the rating
    /// currently contributes.
    pub fn set_rating_weight(&self, rating_id: &str, weight: i32) -> Result<Rating> {
        validate_weight(weight)?;

        let (rating, changed) = self.locks.with(rating_id, || {
            let mut rating = match self.load(rating_id)? {
                AssetRecord::Rating(rating) => rating,
                _ => {
                    return Err(GovernanceError::invalid_target(
                        rating_id,
                        &[AssetKind::Rating],
                    ))
                }
            };
            if rating.weight == weight {
                return Ok((rating, false));
            }
            rating.weight = weight;
            self.store.put(&rating.clone().into())?;
            Ok((rating, true))
        })?;

        tracing::debug!(%rating_id, weight, "rating weight set");
        if changed && rating.is_contributing() {
            self.recompute(&rating.target_id)?;
        }
        Ok(rating)
    }

    /// Recompute the target of a rating whose contribution may have changed.
    pub(super) fn after_rating_change(&self, before: &AssetRecord, after: &AssetRecord) -> Result<()> {
        let AssetRecord::Rating(rating) = after else {
            return Ok(());
        };
        let was = before.status() == Status::Active;
        let is = after.status() == Status::Active;
        if was != is {
            self.recompute(&rating.target_id)?;
        }
        Ok(())
    }
}
