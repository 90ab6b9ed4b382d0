//! The asset store boundary.
//!
//! The engine never owns persistence. It reads and writes whole records
//! through [`AssetStore`]; any backend failure surfaces as
//! `StorageUnavailable` and retrying is left to the host.

mod loro_store;
mod memory;

pub use loro_store::LoroStore;
pub use memory::MemoryStore;

use crate::asset::{AssetRecord, Rating};
use crate::error::Result;
use crate::review::Review;
use crate::user::User;
use crate::voting::Vote;

pub trait AssetStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<AssetRecord>>;

    /// Insert or replace the record with the same id.
    fn put(&self, record: &AssetRecord) -> Result<()>;

    fn list(&self) -> Result<Vec<AssetRecord>>;

    /// Every rating targeting `asset_id`, whatever its status.
    fn query_ratings_for(&self, asset_id: &str) -> Result<Vec<Rating>>;

    /// All reviews of `asset_id`, oldest request first.
    fn reviews_for(&self, asset_id: &str) -> Result<Vec<Review>>;

    fn put_review(&self, review: &Review) -> Result<()>;

    /// The vote `voter_id` currently holds on `target_id`.
    fn vote(&self, voter_id: &str, target_id: &str) -> Result<Option<Vote>>;

    fn votes_for(&self, target_id: &str) -> Result<Vec<Vote>>;

    /// Insert or replace the vote for its (voter, target) pair.
    fn put_vote(&self, vote: &Vote) -> Result<()>;

    fn get_user(&self, id: &str) -> Result<Option<User>>;

    fn put_user(&self, user: &User) -> Result<()>;
}

/// Request order, with an open review after decided ones requested at the
/// same instant.
pub(crate) fn sort_reviews(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| {
        (a.requested_at, a.is_open(), &a.id).cmp(&(b.requested_at, b.is_open(), &b.id))
    });
}
