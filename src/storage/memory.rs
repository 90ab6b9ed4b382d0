use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{sort_reviews, AssetStore};
use crate::asset::{AssetRecord, Rating, Reviewable};
use crate::error::{GovernanceError, Result};
use crate::review::Review;
use crate::user::User;
use crate::voting::{vote_key, Vote};

/// Process-local store backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    assets: RwLock<HashMap<String, AssetRecord>>,
    reviews: RwLock<HashMap<String, Review>>,
    votes: RwLock<HashMap<String, Vote>>,
    users: RwLock<HashMap<String, User>>,
    offline: AtomicBool,
    write_budget: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StorageUnavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Let `budget` more writes succeed, then fail every write with
    /// `StorageUnavailable`. `None` lifts the limit.
    pub fn set_write_budget(&self, budget: Option<usize>) {
        if let Ok(mut current) = self.write_budget.lock() {
            *current = budget;
        }
    }

    fn spend_write(&self) -> Result<()> {
        let mut budget = self
            .write_budget
            .lock()
            .map_err(|_| GovernanceError::StorageUnavailable("lock poisoned".to_string()))?;
        match budget.as_mut() {
            Some(0) => Err(GovernanceError::StorageUnavailable(
                "memory store write failed".to_string(),
            )),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GovernanceError::StorageUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn read<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockReadGuard<'a, T>> {
        self.check()?;
        lock.read()
            .map_err(|_| GovernanceError::StorageUnavailable("lock poisoned".to_string()))
    }

    fn write<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockWriteGuard<'a, T>> {
        self.check()?;
        self.spend_write()?;
        lock.write()
            .map_err(|_| GovernanceError::StorageUnavailable("lock poisoned".to_string()))
    }
}

impl AssetStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<AssetRecord>> {
        Ok(self.read(&self.assets)?.get(id).cloned())
    }

    fn put(&self, record: &AssetRecord) -> Result<()> {
        self.write(&self.assets)?
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<AssetRecord>> {
        let mut records: Vec<AssetRecord> = self.read(&self.assets)?.values().cloned().collect();
        records.sort_by(|a, b| a.envelope().created_at.cmp(&b.envelope().created_at));
        Ok(records)
    }

    fn query_ratings_for(&self, asset_id: &str) -> Result<Vec<Rating>> {
        Ok(self
            .read(&self.assets)?
            .values()
            .filter_map(|record| match record {
                AssetRecord::Rating(r) if r.target_id == asset_id => Some(r.clone()),
                _ => None,
            })
            .collect())
    }

    fn reviews_for(&self, asset_id: &str) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .read(&self.reviews)?
            .values()
            .filter(|r| r.asset_id == asset_id)
            .cloned()
            .collect();
        sort_reviews(&mut reviews);
        Ok(reviews)
    }

    fn put_review(&self, review: &Review) -> Result<()> {
        self.write(&self.reviews)?
            .insert(review.id.clone(), review.clone());
        Ok(())
    }

    fn vote(&self, voter_id: &str, target_id: &str) -> Result<Option<Vote>> {
        Ok(self
            .read(&self.votes)?
            .get(&vote_key(voter_id, target_id))
            .cloned())
    }

    fn votes_for(&self, target_id: &str) -> Result<Vec<Vote>> {
        Ok(self
            .read(&self.votes)?
            .values()
            .filter(|v| v.target_id == target_id)
            .cloned()
            .collect())
    }

    fn put_vote(&self, vote: &Vote) -> Result<()> {
        self.write(&self.votes)?
            .insert(vote.composite_key(), vote.clone());
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.read(&self.users)?.get(id).cloned())
    }

    fn put_user(&self, user: &User) -> Result<()> {
        self.write(&self.users)?.insert(user.id.clone(), user.clone());
        Ok(())
    }
}
