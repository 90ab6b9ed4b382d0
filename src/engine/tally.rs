//! Votes and flags.

use chrono::{DateTime, Utc};

use super::Engine;
use crate::asset::{is_terminal, AssetKind, AssetRecord, Reviewable, Status};
use crate::error::{GovernanceError, Result};
use crate::storage::AssetStore;
use crate::voting::{net_votes, supersede, validate_vote_value, Flag, FlagReason, Vote, VoteKind};

impl<S: AssetStore> Engine<S> {
    /// Cast, change or clear (`value == 0`) a vote. One vote is kept per
    /// voter and target.
    pub fn cast_vote(&self, voter_id: &str, target_id: &str, kind: VoteKind, value: i32) -> Result<Vote> {
        self.cast_vote_at(voter_id, target_id, kind, value, Utc::now())
    }

    /// Like [`Engine::cast_vote`] with an explicit timestamp. A vote older
    /// than the one already stored for the pair is ignored and the stored
    /// vote is returned.
    pub fn cast_vote_at(
        &self,
        voter_id: &str,
        target_id: &str,
        kind: VoteKind,
        value: i32,
        at: DateTime<Utc>,
    ) -> Result<Vote> {
        let value = validate_vote_value(value)?;

        let (target, vote, before, after) = self.locks.with(target_id, || {
            let target = self.load(target_id)?;
            if target.kind() != kind.target_kind() {
                return Err(GovernanceError::invalid_target(target_id, &[kind.target_kind()]));
            }

            let existing = self.store.vote(voter_id, target_id)?;
            let merged = supersede(existing.as_ref(), Vote::new(voter_id, target_id, kind, value, at));
            if existing.as_ref() == Some(&merged) {
                tracing::debug!(%voter_id, %target_id, "stale vote ignored");
                let net = net_votes(&self.store.votes_for(target_id)?);
                return Ok((target, merged, net, net));
            }

            let before = net_votes(&self.store.votes_for(target_id)?);
            self.store.put_vote(&merged)?;
            let after = net_votes(&self.store.votes_for(target_id)?);
            Ok((target, merged, before, after))
        })?;

        if before == after {
            return Ok(vote);
        }
        tracing::info!(%voter_id, %target_id, value = vote.value, net = after, "vote recorded");

        if let Some(author) = target.submitted_by() {
            let delta = self.policy.on_votes(target.kind(), before, after);
            self.adjust_reputation(author, delta)?;
        }

        if let AssetRecord::Rating(rating) = &target {
            if rating.is_contributing() {
                self.recompute(&rating.target_id)?;
            }
        }

        if let Some(threshold) = self.config.down_vote_threshold {
            if after <= -threshold && before > -threshold && target.status() == Status::Active {
                self.trigger_re_review(target_id, &format!("net votes reached {}", after))?;
            }
        }

        Ok(vote)
    }

    /// Net vote total on a rating, information or comment.
    pub fn net_votes(&self, target_id: &str) -> Result<i64> {
        Ok(net_votes(&self.store.votes_for(target_id)?))
    }

    /// Flag a comment. An active comment whose unacknowledged flags exceed
    /// `flag_threshold` is sent back to review. Deleted and rejected
    /// comments cannot be flagged.
    pub fn flag(&self, target_id: &str, reason: FlagReason) -> Result<Flag> {
        let threshold = self.config.flag_threshold;
        self.locks.with(target_id, || {
            let mut comment = match self.load(target_id)? {
                AssetRecord::Comment(comment) => comment,
                _ => {
                    return Err(GovernanceError::invalid_target(
                        target_id,
                        &[AssetKind::Comment],
                    ))
                }
            };

            if is_terminal(comment.status()) {
                return Err(GovernanceError::InvalidTransition {
                    from: comment.status(),
                    to: Status::Preliminary,
                });
            }

            comment.flag.raise(reason);
            self.store.put(&comment.clone().into())?;
            tracing::debug!(%target_id, %reason, pending = comment.flag.pending(), "comment flagged");

            if comment.status() == Status::Active && comment.flag.exceeds(threshold) {
                let reason = format!("{} unacknowledged flags", comment.flag.pending());
                self.re_review_locked(target_id, &reason)?;
            }
            Ok(comment.flag)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::asset::{Comment, InfoCategory, Information};
    use crate::config::GovernanceConfig;
    use crate::events::GovernanceEvent;
    use crate::review::Verdict;
    use chrono::Duration;

    fn active_comment(engine: &crate::engine::Engine<crate::storage::MemoryStore>) -> String {
        let product = active_product(engine);
        let comment = engine
            .submit(Comment::new(product, "tastes like feet".to_string(), 0, Some("dave".to_string())).into())
            .unwrap();
        engine.submit_review(comment.id(), Verdict::approve()).unwrap();
        comment.id().to_string()
    }

    #[test]
    fn test_vote_value_validated_before_anything() {
        let (engine, _) = engine(GovernanceConfig::default());
        let comment = active_comment(&engine);

        assert!(matches!(
            engine.cast_vote("bob", &comment, VoteKind::Comment, 2),
            Err(GovernanceError::InvalidVoteValue(2))
        ));
        assert_eq!(engine.net_votes(&comment).unwrap(), 0);
    }

    #[test]
    fn test_revote_replaces_previous_vote() {
        let (engine, _) = engine(GovernanceConfig::default());
        let comment = active_comment(&engine);

        let first = engine.cast_vote("bob", &comment, VoteKind::Comment, 1).unwrap();
        engine.cast_vote("carol", &comment, VoteKind::Comment, 1).unwrap();
        assert_eq!(engine.net_votes(&comment).unwrap(), 2);

        let second = engine.cast_vote("bob", &comment, VoteKind::Comment, -1).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(engine.net_votes(&comment).unwrap(), 0);

        engine.cast_vote("bob", &comment, VoteKind::Comment, 0).unwrap();
        assert_eq!(engine.net_votes(&comment).unwrap(), 1);
        assert_eq!(engine.store().votes_for(&comment).unwrap().len(), 2);
    }

    #[test]
    fn test_stale_vote_loses() {
        let (engine, _) = engine(GovernanceConfig::default());
        let comment = active_comment(&engine);
        let now = Utc::now();

        engine
            .cast_vote_at("bob", &comment, VoteKind::Comment, 1, now)
            .unwrap();
        let kept = engine
            .cast_vote_at("bob", &comment, VoteKind::Comment, -1, now - Duration::seconds(10))
            .unwrap();

        assert_eq!(kept.value, 1);
        assert_eq!(engine.net_votes(&comment).unwrap(), 1);
    }

    #[test]
    fn test_vote_kind_must_match_target() {
        let (engine, _) = engine(GovernanceConfig::default());
        let comment = active_comment(&engine);

        assert!(matches!(
            engine.cast_vote("bob", &comment, VoteKind::Rating, 1),
            Err(GovernanceError::InvalidTarget { .. })
        ));
        assert!(matches!(
            engine.cast_vote("bob", "ghost", VoteKind::Comment, 1),
            Err(GovernanceError::AssetNotFound(_))
        ));
    }

    #[test]
    fn test_votes_reward_author_in_steps() {
        let (engine, sink) = engine(GovernanceConfig::default());
        let product = active_product(&engine);
        let info = engine
            .submit(
                Information::new(
                    product,
                    "Fair trade certified".to_string(),
                    InfoCategory::CorporateSocialResponsibility,
                    1,
                    Some("carol".to_string()),
                )
                .into(),
            )
            .unwrap();
        engine.submit_review(info.id(), Verdict::approve()).unwrap();
        assert_eq!(engine.user("carol").unwrap().reputation, 1);

        for voter in ["v1", "v2", "v3", "v4", "v5"] {
            engine.cast_vote(voter, info.id(), VoteKind::Information, 1).unwrap();
        }
        assert_eq!(engine.user("carol").unwrap().reputation, 2);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            GovernanceEvent::ReputationAdjusted { user_id, delta: 1, reputation: 2 } if user_id == "carol"
        )));

        engine.cast_vote("v5", info.id(), VoteKind::Information, 0).unwrap();
        assert_eq!(engine.user("carol").unwrap().reputation, 1);
    }

    #[test]
    fn test_down_votes_trigger_re_review() {
        let config = GovernanceConfig {
            down_vote_threshold: Some(2),
            ..GovernanceConfig::default()
        };
        let (engine, _) = engine(config);
        let product = active_product(&engine);
        let rating = active_rating(&engine, &product, 10.0, 1);
        active_rating(&engine, &product, 90.0, 1);
        assert_eq!(score_of(&engine, &product), Some(50.0));

        engine.cast_vote("carol", &rating, VoteKind::Rating, -1).unwrap();
        assert_eq!(engine.get(&rating).unwrap().status(), Status::Active);

        engine.cast_vote("dave", &rating, VoteKind::Rating, -1).unwrap();
        assert_eq!(engine.get(&rating).unwrap().status(), Status::Preliminary);
        assert!(engine.pending_review(&rating).unwrap().is_some());
        assert_eq!(score_of(&engine, &product), Some(90.0));
    }

    #[test]
    fn test_flags_past_threshold_send_comment_back() {
        let (engine, sink) = engine(GovernanceConfig::default());
        let comment = active_comment(&engine);

        for _ in 0..10 {
            engine.flag(&comment, FlagReason::Inappropriate).unwrap();
        }
        assert_eq!(engine.get(&comment).unwrap().status(), Status::Active);

        let flag = engine.flag(&comment, FlagReason::Incorrect).unwrap();
        assert_eq!(flag.total(), 11);
        assert_eq!(engine.get(&comment).unwrap().status(), Status::Preliminary);
        assert!(engine.pending_review(&comment).unwrap().is_some());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, GovernanceEvent::ReReviewTriggered { asset_id, .. } if *asset_id == comment)));

        // more flags while queued do not open another review
        engine.flag(&comment, FlagReason::Trivial).unwrap();
        let open = engine
            .reviews(&comment)
            .unwrap()
            .iter()
            .filter(|r| r.is_open())
            .count();
        assert_eq!(open, 1);
    }

    #[test]
    fn test_approval_acknowledges_flags() {
        let config = GovernanceConfig {
            flag_threshold: 1,
            ..GovernanceConfig::default()
        };
        let (engine, _) = engine(config);
        let comment = active_comment(&engine);

        engine.flag(&comment, FlagReason::Other).unwrap();
        engine.flag(&comment, FlagReason::Other).unwrap();
        assert_eq!(engine.get(&comment).unwrap().status(), Status::Preliminary);

        engine.submit_review(&comment, Verdict::approve()).unwrap();
        match engine.get(&comment).unwrap() {
            AssetRecord::Comment(c) => {
                assert_eq!(c.status(), Status::Active);
                assert_eq!(c.flag.pending(), 0);
            }
            other => panic!("Expected comment, got {:?}", other),
        }

        // one more flag is within the threshold again
        engine.flag(&comment, FlagReason::Other).unwrap();
        assert_eq!(engine.get(&comment).unwrap().status(), Status::Active);
    }

    #[test]
    fn test_only_comments_can_be_flagged() {
        let (engine, _) = engine(GovernanceConfig::default());
        let product = active_product(&engine);
        assert!(matches!(
            engine.flag(&product, FlagReason::Incorrect),
            Err(GovernanceError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_terminal_comments_cannot_be_flagged() {
        let (engine, _) = engine(GovernanceConfig::default());
        let comment = active_comment(&engine);
        engine.delete(&comment, Some("dave")).unwrap();
        let tombstone = engine.get(&comment).unwrap();

        assert!(matches!(
            engine.flag(&comment, FlagReason::Trivial),
            Err(GovernanceError::InvalidTransition { from: Status::Deleted, .. })
        ));
        assert_eq!(engine.get(&comment).unwrap(), tombstone);
    }

    #[test]
    fn test_concurrent_revotes_keep_one_vote() {
        use std::sync::Arc;
        use std::thread;

        let (engine, _) = engine(GovernanceConfig::default());
        let engine = Arc::new(engine);
        let comment = active_comment(&engine);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let comment = comment.clone();
                let value = if i % 2 == 0 { 1 } else { -1 };
                thread::spawn(move || {
                    engine
                        .cast_vote("bob", &comment, VoteKind::Comment, value)
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let votes = engine.store().votes_for(&comment).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].voter_id, "bob");
        assert!(engine.net_votes(&comment).unwrap().abs() <= 1);
        assert_eq!(engine.store().vote("bob", &comment).unwrap(), Some(votes[0].clone()));
    }

    #[test]
    fn test_concurrent_votes_are_all_counted() {
        use std::sync::Arc;
        use std::thread;

        let (engine, _) = engine(GovernanceConfig::default());
        let engine = Arc::new(engine);
        let comment = active_comment(&engine);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let comment = comment.clone();
                thread::spawn(move || {
                    engine
                        .cast_vote(&format!("voter-{}", i), &comment, VoteKind::Comment, 1)
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(engine.net_votes(&comment).unwrap(), 16);
    }
}
