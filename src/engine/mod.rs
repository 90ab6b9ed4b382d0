//! The governance engine.
//!
//! [`Engine`] drives asset status through moderation, recomputes scores when
//! contributing ratings change, and tallies votes and flags. It holds no
//! records itself: every operation reads the current records from its
//! [`AssetStore`], validates, and writes back whole records. Mutations of a
//! single asset are serialized through [`AssetLocks`].

mod locks;
mod scoring;
mod tally;
mod workflow;

pub use locks::AssetLocks;

use std::sync::Arc;

use crate::asset::{AssetRecord, Reviewable};
use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, Rejection, Result};
use crate::events::{EventSink, GovernanceEvent, TracingSink};
use crate::reputation::ReputationPolicy;
use crate::review::Review;
use crate::storage::AssetStore;
use crate::user::{ProfileUpdate, User};

pub struct Engine<S: AssetStore> {
    store: S,
    config: GovernanceConfig,
    policy: Box<dyn ReputationPolicy>,
    sink: Option<Arc<dyn EventSink>>,
    locks: AssetLocks,
}

impl<S: AssetStore> Engine<S> {
    /// Create an engine using the configured reputation table and logging
    /// events through `tracing`.
    pub fn new(store: S, config: GovernanceConfig) -> Self {
        let policy = Box::new(config.reputation.clone());
        Self {
            store,
            config,
            policy,
            sink: Some(Arc::new(TracingSink)),
            locks: AssetLocks::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn without_sink(mut self) -> Self {
        self.sink = None;
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn ReputationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    fn emit(&self, event: GovernanceEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(&event);
        }
    }

    fn load(&self, id: &str) -> Result<AssetRecord> {
        self.store
            .get(id)?
            .ok_or_else(|| GovernanceError::AssetNotFound(id.to_string()))
    }

    /// Current record of an asset.
    pub fn get(&self, id: &str) -> Result<AssetRecord> {
        self.load(id)
    }

    /// Review history of an asset, oldest first.
    pub fn reviews(&self, asset_id: &str) -> Result<Vec<Review>> {
        self.store.reviews_for(asset_id)
    }

    /// The open review of an asset, if it is waiting for moderation.
    pub fn pending_review(&self, asset_id: &str) -> Result<Option<Review>> {
        Ok(self
            .store
            .reviews_for(asset_id)?
            .into_iter()
            .find(|r| r.is_open()))
    }

    /// Pair a failed operation with the asset's current record so callers
    /// can show the true state after the failure.
    pub fn reject(&self, error: GovernanceError, asset_id: &str) -> Rejection {
        let current = self.store.get(asset_id).ok().flatten();
        Rejection { error, current }
    }

    pub fn register_user(&self, user: &User) -> Result<()> {
        self.locks
            .with(&user_key(&user.id), || self.store.put_user(user))
    }

    pub fn user(&self, id: &str) -> Result<User> {
        self.store
            .get_user(id)?
            .ok_or_else(|| GovernanceError::UserNotFound(id.to_string()))
    }

    /// Apply a user's own profile changes.
    pub fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User> {
        self.locks.with(&user_key(user_id), || {
            let mut user = self.user(user_id)?;
            user.apply(update);
            self.store.put_user(&user)?;
            tracing::debug!(%user_id, "profile updated");
            Ok(user)
        })
    }

    /// Read-modify-write on a user record. Missing users are skipped; the
    /// identity side owns their creation.
    fn with_user(&self, user_id: &str, f: impl FnOnce(&mut User)) -> Result<Option<User>> {
        self.locks.with(&user_key(user_id), || {
            let Some(mut user) = self.store.get_user(user_id)? else {
                tracing::debug!(%user_id, "unknown user, skipping update");
                return Ok(None);
            };
            f(&mut user);
            self.store.put_user(&user)?;
            Ok(Some(user))
        })
    }

    fn adjust_reputation(&self, user_id: &str, delta: i32) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        let mut reputation = 0;
        let updated = self.with_user(user_id, |user| {
            reputation = user.adjust_reputation(delta);
        })?;
        if updated.is_some() {
            self.emit(GovernanceEvent::ReputationAdjusted {
                user_id: user_id.to_string(),
                delta,
                reputation,
            });
        }
        Ok(())
    }

    fn emit_transition(&self, record: &AssetRecord, from: Option<crate::asset::Status>) {
        self.emit(GovernanceEvent::AssetTransitioned {
            asset_id: record.id().to_string(),
            kind: record.kind(),
            from,
            to: record.status(),
        });
    }
}

fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::Engine;
    use crate::asset::{AssetRecord, Product, Rating, Reviewable};
    use crate::config::GovernanceConfig;
    use crate::events::RecordingSink;
    use crate::review::Verdict;
    use crate::storage::MemoryStore;
    use crate::user::User;

    pub fn engine(config: GovernanceConfig) -> (Engine<MemoryStore>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let engine = Engine::new(MemoryStore::new(), config).with_sink(sink.clone());
        for id in ["alice", "bob", "carol", "dave"] {
            engine
                .register_user(&User::person(id.to_string(), id.to_string()))
                .unwrap();
        }
        (engine, sink)
    }

    pub fn active_product(engine: &Engine<MemoryStore>) -> String {
        let product = engine
            .submit(Product::new("4006381333931".to_string(), Some("alice".to_string())).into())
            .unwrap();
        engine.submit_review(product.id(), Verdict::approve()).unwrap();
        product.id().to_string()
    }

    pub fn active_rating(
        engine: &Engine<MemoryStore>,
        target: &str,
        score: f64,
        weight: i32,
    ) -> String {
        let rating = engine
            .submit(Rating::new(target.to_string(), score, weight, Some("bob".to_string())).into())
            .unwrap();
        engine.submit_review(rating.id(), Verdict::approve()).unwrap();
        rating.id().to_string()
    }

    pub fn score_of(engine: &Engine<MemoryStore>, id: &str) -> Option<f64> {
        match engine.get(id).unwrap() {
            AssetRecord::Product(p) => p.score.map(|s| s.value),
            other => panic!("Expected product, got {:?}", other),
        }
    }
}
