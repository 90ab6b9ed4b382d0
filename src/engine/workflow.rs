//! Submission, review decisions, revisions and deletion.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Engine;
use crate::asset::{transition, AssetKind, AssetRecord, Reviewable, Status};
use crate::error::{GovernanceError, Result};
use crate::events::GovernanceEvent;
use crate::review::{Review, ReviewDecision, Verdict};
use crate::score::{validate_score, validate_weight};
use crate::storage::AssetStore;

impl<S: AssetStore> Engine<S> {
    /// Ingest a new asset. It is stored as preliminary with an open review.
    pub fn submit(&self, record: AssetRecord) -> Result<AssetRecord> {
        let now = Utc::now();
        self.validate_submission(&record)?;

        let mut record = record;
        if record.status() != Status::Preliminary {
            tracing::debug!(asset_id = %record.id(), status = %record.status(), "submission forced to preliminary");
            record.envelope_mut().status = Status::Preliminary;
        }
        record.set_score(None);

        let id = record.id().to_string();
        self.locks.with(&id, || {
            if self.store.get(&id)?.is_some() {
                return Err(GovernanceError::DuplicateAsset(id.clone()));
            }
            // the record is the last write; until it lands a retry starts over
            self.ensure_open_review(&id, now)?;
            self.store.put(&record)?;
            Ok(())
        })?;

        tracing::info!(asset_id = %id, kind = %record.kind(), "asset submitted");
        self.emit_transition(&record, None);

        if let (AssetRecord::Comment(_), Some(author)) = (&record, record.submitted_by()) {
            self.with_user(author, |user| user.last_comment_at = Some(now))?;
        }

        Ok(record)
    }

    fn validate_submission(&self, record: &AssetRecord) -> Result<()> {
        if let Some(weight) = record.weight() {
            validate_weight(weight)?;
        }

        let Some(target_id) = record.target_id() else {
            return Ok(());
        };
        let target = self.load(target_id)?;
        match record {
            AssetRecord::Rating(rating) => {
                validate_score(rating.score)?;
                if !target.kind().is_scorable() {
                    return Err(GovernanceError::invalid_target(
                        target_id,
                        &AssetKind::SCORABLE,
                    ));
                }
            }
            AssetRecord::Information(_) => {
                if !target.kind().is_scorable() {
                    return Err(GovernanceError::invalid_target(
                        target_id,
                        &AssetKind::SCORABLE,
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Record a moderation decision on the asset's open review.
    ///
    /// Approval activates the asset, rejection rejects it, and ignoring
    /// leaves it preliminary with a fresh open review. Nothing is written if
    /// any check fails.
    pub fn submit_review(&self, asset_id: &str, verdict: Verdict) -> Result<Review> {
        verdict.validate()?;
        let now = Utc::now();

        let (before, after, decided) = self.locks.with(asset_id, || {
            let asset = self.load(asset_id)?;
            let reviews = self.store.reviews_for(asset_id)?;
            let open = match reviews.iter().find(|r| r.is_open()) {
                Some(open) => open.clone(),
                None if reviews.is_empty() => {
                    return Err(GovernanceError::NoPendingReview(asset_id.to_string()))
                }
                // a preliminary asset is always under review
                None if asset.status() == Status::Preliminary => Review::open(asset_id, now),
                None => return Err(GovernanceError::AlreadyDecided(asset_id.to_string())),
            };

            let decided = open.decide(&verdict, now)?;
            let mut next = transition(&asset, verdict.target_status(), now)?;
            if let (ReviewDecision::Approved, AssetRecord::Comment(comment)) =
                (verdict.decision, &mut next)
            {
                comment.flag.acknowledge();
            }

            // An earlier attempt may have moved the asset and then failed to
            // record the review. Report the move as if it happened now.
            let mut before = asset.clone();
            if asset.status() != Status::Preliminary && asset.status() == verdict.target_status() {
                before.envelope_mut().status = Status::Preliminary;
            }

            // The decided review is written last. Until it lands the review
            // stays open and the whole decision can be retried.
            if next != asset {
                self.store.put(&next)?;
            }
            if verdict.decision == ReviewDecision::Ignored
                && !reviews.iter().any(|r| r.is_open() && r.id != open.id)
            {
                self.store.put_review(&Review::open(asset_id, now))?;
            }
            self.store.put_review(&decided)?;
            Ok((before, next, decided))
        })?;

        tracing::info!(
            %asset_id,
            decision = %decided.decision,
            reviewer = decided.reviewer.as_deref().unwrap_or("-"),
            "review decided"
        );
        self.emit(GovernanceEvent::ReviewSubmitted {
            review_id: decided.id.clone(),
            asset_id: asset_id.to_string(),
            decision: decided.decision,
        });
        if before.status() != after.status() {
            self.emit_transition(&after, Some(before.status()));
        }

        if let Some(author) = after.submitted_by() {
            let delta = self.policy.on_review(after.kind(), decided.decision);
            self.adjust_reputation(author, delta)?;
        }
        self.after_rating_change(&before, &after)?;

        Ok(decided)
    }

    /// Replace an active, updatable asset with a new version.
    ///
    /// The old version becomes outdated. The replacement is validated like a
    /// submission and stored as preliminary, pointing back at the old one,
    /// under an id derived from it. The caller's id is ignored.
    pub fn revise(
        &self,
        asset_id: &str,
        replacement: AssetRecord,
        change_reason: Option<String>,
    ) -> Result<AssetRecord> {
        let now = Utc::now();
        self.validate_submission(&replacement)?;

        let (old, outdated, new) = self.locks.with(asset_id, || {
            let old = self.load(asset_id)?;
            if old.kind() != replacement.kind() {
                return Err(GovernanceError::invalid_target(asset_id, &[replacement.kind()]));
            }
            let outdated = transition(&old, Status::Outdated, now)?;
            if outdated == old {
                // already outdated: a newer version exists
                return Err(GovernanceError::InvalidTransition {
                    from: old.status(),
                    to: Status::Outdated,
                });
            }

            let new = new_version(replacement, asset_id, change_reason, now);
            if let Some(existing) = self.store.get(new.id())? {
                // only a version left behind by a failed revision may be replaced
                let supersedes = existing.revision().and_then(|r| r.supersedes.as_deref());
                if supersedes != Some(asset_id) {
                    return Err(GovernanceError::DuplicateAsset(new.id().to_string()));
                }
            }

            // the old version is outdated last so a failed revision can be retried
            self.store.put(&new)?;
            self.ensure_open_review(new.id(), now)?;
            self.store.put(&outdated)?;
            Ok((old, outdated, new))
        })?;

        tracing::info!(%asset_id, new_id = %new.id(), "asset revised");
        self.emit_transition(&outdated, Some(old.status()));
        self.emit_transition(&new, None);
        Ok(new)
    }

    /// Tombstone an active or preliminary asset. Any open review is
    /// withdrawn as ignored.
    pub fn delete(&self, asset_id: &str, actor: Option<&str>) -> Result<AssetRecord> {
        let now = Utc::now();

        let (before, after) = self.locks.with(asset_id, || -> Result<(AssetRecord, AssetRecord)> {
            let asset = self.load(asset_id)?;
            let deleted = transition(&asset, Status::Deleted, now)?;
            if deleted == asset {
                return Ok((asset, deleted));
            }

            // a retry after a failed tombstone write finds no open review
            if let Some(open) = self.pending_review(asset_id)? {
                let mut withdraw = Verdict::ignore().with_comment("withdrawn: asset deleted");
                withdraw.reviewer = actor.map(str::to_string);
                self.store.put_review(&open.decide(&withdraw, now)?)?;
            }
            self.store.put(&deleted)?;
            Ok((asset, deleted))
        })?;

        if before.status() == after.status() {
            return Ok(after);
        }

        tracing::info!(%asset_id, actor = actor.unwrap_or("-"), "asset deleted");
        self.emit_transition(&after, Some(before.status()));

        if let (AssetRecord::Comment(_), Some(author)) = (&after, after.submitted_by()) {
            self.with_user(author, |user| user.last_comment_deleted_at = Some(now))?;
        }
        self.after_rating_change(&before, &after)?;

        Ok(after)
    }

    /// Send an active asset back to moderation.
    pub fn trigger_re_review(&self, asset_id: &str, reason: &str) -> Result<AssetRecord> {
        let (before, after) = self
            .locks
            .with(asset_id, || self.re_review_locked(asset_id, reason))?;
        self.after_rating_change(&before, &after)?;
        Ok(after)
    }

    /// Caller holds the lock for `asset_id`. A preliminary asset is already
    /// queued and is returned unchanged.
    pub(super) fn re_review_locked(
        &self,
        asset_id: &str,
        reason: &str,
    ) -> Result<(AssetRecord, AssetRecord)> {
        let now = Utc::now();
        let asset = self.load(asset_id)?;
        if asset.status() == Status::Preliminary {
            self.ensure_open_review(asset_id, now)?;
            return Ok((asset.clone(), asset));
        }

        let requeued = transition(&asset, Status::Preliminary, now)?;
        self.ensure_open_review(asset_id, now)?;
        self.store.put(&requeued)?;

        self.emit(GovernanceEvent::ReReviewTriggered {
            asset_id: asset_id.to_string(),
            reason: reason.to_string(),
        });
        self.emit_transition(&requeued, Some(asset.status()));
        Ok((asset, requeued))
    }

    /// Caller holds the lock for `asset_id`. Opens a review unless one is
    /// already open.
    fn ensure_open_review(&self, asset_id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.pending_review(asset_id)?.is_none() {
            self.store.put_review(&Review::open(asset_id, now))?;
        }
        Ok(())
    }
}

/// Id of the version that replaces `supersedes`. An asset is revised at most
/// once, so the id is derived from the one it replaces.
fn version_id(supersedes: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("viridian:revision:{}", supersedes).as_bytes())
        .to_string()
}

fn new_version(
    mut record: AssetRecord,
    supersedes: &str,
    change_reason: Option<String>,
    now: DateTime<Utc>,
) -> AssetRecord {
    {
        let envelope = record.envelope_mut();
        envelope.id = version_id(supersedes);
        envelope.created_at = now;
        envelope.status = Status::Preliminary;
    }
    if let Some(revision) = record.revision_mut() {
        revision.updated_at = now;
        revision.change_reason = change_reason;
        revision.supersedes = Some(supersedes.to_string());
    }
    record.set_score(None);
    record
}
