use std::fs;
use std::path::{Path, PathBuf};

use loro::{LoroDoc, LoroValue, ValueOrContainer};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{sort_reviews, AssetStore};
use crate::asset::{AssetRecord, Rating, Reviewable};
use crate::error::{GovernanceError, Result};
use crate::review::Review;
use crate::user::User;
use crate::voting::{vote_key, Vote};

const VIRIDIAN_DIR: &str = ".viridian";
const LORO_DB: &str = "loro.db";

const ASSETS: &str = "assets";
const REVIEWS: &str = "reviews";
const VOTES: &str = "votes";
const USERS: &str = "users";

/// Persistent store kept in a Loro CRDT document.
///
/// Each record family is a top-level map keyed by id. An entry is a nested
/// map holding a few indexed scalars next to the record's JSON body.
pub struct LoroStore {
    doc: LoroDoc,
    path: PathBuf,
}

impl LoroStore {
    /// Initialize a new viridian project
    pub fn init(root: &Path) -> Result<Self> {
        let dir = root.join(VIRIDIAN_DIR);

        if dir.exists() {
            return Err(GovernanceError::AlreadyInitialized);
        }

        fs::create_dir_all(&dir)?;

        let doc = LoroDoc::new();
        let path = dir.join(LORO_DB);

        let store = Self { doc, path };
        store.save()?;

        Ok(store)
    }

    /// Open an existing viridian project
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(VIRIDIAN_DIR).join(LORO_DB);

        if !path.exists() {
            return Err(GovernanceError::NotInitialized);
        }

        let bytes = fs::read(&path)?;
        let doc = LoroDoc::new();
        doc.import(&bytes)?;

        Ok(Self { doc, path })
    }

    /// Save the document to disk
    pub fn save(&self) -> Result<()> {
        let bytes = self.doc.export(loro::ExportMode::Snapshot)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// The `.viridian` directory
    pub fn data_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Version of the current document state, for cache invalidation
    pub fn version_hash(&self) -> String {
        let vv = self.doc.oplog_vv();
        format!("{:?}", vv)
    }

    fn write_entry<T: Serialize>(
        &self,
        family: &str,
        key: &str,
        value: &T,
        index: &[(&str, String)],
    ) -> Result<()> {
        let map = self.doc.get_map(family);
        let entry = map.ensure_mergeable_map(key)?;

        for (field, v) in index {
            entry.insert(*field, v.clone())?;
        }
        entry.insert("json", serde_json::to_string(value)?)?;

        self.doc.commit();
        Ok(())
    }

    fn read_entry<T: DeserializeOwned>(&self, family: &str, key: &str) -> Result<Option<T>> {
        let map = self.doc.get_map(family);

        let entry = match map.get(key) {
            Some(ValueOrContainer::Container(loro::Container::Map(entry))) => entry,
            _ => return Ok(None),
        };

        match entry.get("json") {
            Some(ValueOrContainer::Value(LoroValue::String(s))) => {
                let parsed = serde_json::from_str(&s).map_err(|e| {
                    GovernanceError::StorageUnavailable(format!(
                        "corrupt {} entry {}: {}",
                        family, key, e
                    ))
                })?;
                Ok(Some(parsed))
            }
            _ => Err(GovernanceError::StorageUnavailable(format!(
                "{} entry {} has no body",
                family, key
            ))),
        }
    }

    /// Parse every entry of a family whose indexed fields match `filter`.
    /// One unreadable entry fails the whole read.
    fn read_entries<T, F>(&self, family: &str, filter: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&loro::LoroMapValue) -> bool,
    {
        let mut out = Vec::new();

        let value = self.doc.get_map(family).get_deep_value();
        if let LoroValue::Map(map) = value {
            for (key, entry) in map.iter() {
                let LoroValue::Map(entry) = entry else {
                    continue;
                };
                if !filter(entry) {
                    continue;
                }
                out.push(parse_body(family, key, entry)?);
            }
        }

        Ok(out)
    }
}

fn parse_body<T: DeserializeOwned>(
    family: &str,
    key: &str,
    entry: &loro::LoroMapValue,
) -> Result<T> {
    match entry.get("json") {
        Some(LoroValue::String(s)) => serde_json::from_str(s).map_err(|e| {
            GovernanceError::StorageUnavailable(format!("corrupt {} entry {}: {}", family, key, e))
        }),
        _ => Err(GovernanceError::StorageUnavailable(format!(
            "{} entry {} has no body",
            family, key
        ))),
    }
}

fn field_is(entry: &loro::LoroMapValue, field: &str, expected: &str) -> bool {
    match entry.get(field) {
        Some(LoroValue::String(s)) => {
            let value: &str = s;
            value == expected
        }
        _ => false,
    }
}

impl AssetStore for LoroStore {
    fn get(&self, id: &str) -> Result<Option<AssetRecord>> {
        self.read_entry(ASSETS, id)
    }

    fn put(&self, record: &AssetRecord) -> Result<()> {
        let mut index = vec![
            ("id", record.id().to_string()),
            ("kind", record.kind().to_string()),
            ("status", record.status().to_string()),
        ];
        if let Some(target_id) = record.target_id() {
            index.push(("target_id", target_id.to_string()));
        }
        self.write_entry(ASSETS, record.id(), record, &index)
    }

    fn list(&self) -> Result<Vec<AssetRecord>> {
        let mut records: Vec<AssetRecord> = self.read_entries(ASSETS, |_| true)?;
        records.sort_by(|a, b| a.envelope().created_at.cmp(&b.envelope().created_at));
        Ok(records)
    }

    fn query_ratings_for(&self, asset_id: &str) -> Result<Vec<Rating>> {
        let records: Vec<AssetRecord> = self.read_entries(ASSETS, |entry| {
            field_is(entry, "kind", "rating") && field_is(entry, "target_id", asset_id)
        })?;
        Ok(records
            .into_iter()
            .filter_map(|record| match record {
                AssetRecord::Rating(r) => Some(r),
                _ => None,
            })
            .collect())
    }

    fn reviews_for(&self, asset_id: &str) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> =
            self.read_entries(REVIEWS, |entry| field_is(entry, "asset_id", asset_id))?;
        sort_reviews(&mut reviews);
        Ok(reviews)
    }

    fn put_review(&self, review: &Review) -> Result<()> {
        let index = [
            ("id", review.id.clone()),
            ("asset_id", review.asset_id.clone()),
            ("decision", review.decision.to_string()),
        ];
        self.write_entry(REVIEWS, &review.id, review, &index)
    }

    fn vote(&self, voter_id: &str, target_id: &str) -> Result<Option<Vote>> {
        self.read_entry(VOTES, &vote_key(voter_id, target_id))
    }

    fn votes_for(&self, target_id: &str) -> Result<Vec<Vote>> {
        self.read_entries(VOTES, |entry| field_is(entry, "target_id", target_id))
    }

    fn put_vote(&self, vote: &Vote) -> Result<()> {
        let index = [
            ("voter_id", vote.voter_id.clone()),
            ("target_id", vote.target_id.clone()),
        ];
        self.write_entry(VOTES, &vote.composite_key(), vote, &index)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.read_entry(USERS, id)
    }

    fn put_user(&self, user: &User) -> Result<()> {
        self.write_entry(USERS, &user.id, user, &[("id", user.id.clone())])
    }
}

impl From<loro::LoroError> for GovernanceError {
    fn from(e: loro::LoroError) -> Self {
        GovernanceError::StorageUnavailable(format!("Loro error: {}", e))
    }
}

impl From<loro::LoroEncodeError> for GovernanceError {
    fn from(e: loro::LoroEncodeError) -> Self {
        GovernanceError::StorageUnavailable(format!("Loro encode error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Comment, Product, Status};
    use crate::voting::VoteKind;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_viridian_directory() {
        let tmp = TempDir::new().unwrap();
        let _store = LoroStore::init(tmp.path()).unwrap();

        assert!(tmp.path().join(".viridian").exists());
        assert!(tmp.path().join(".viridian/loro.db").exists());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let tmp = TempDir::new().unwrap();
        LoroStore::init(tmp.path()).unwrap();

        let result = LoroStore::init(tmp.path());
        assert!(matches!(result, Err(GovernanceError::AlreadyInitialized)));
    }

    #[test]
    fn test_open_fails_if_not_initialized() {
        let tmp = TempDir::new().unwrap();

        let result = LoroStore::open(tmp.path());
        assert!(matches!(result, Err(GovernanceError::NotInitialized)));
    }

    #[test]
    fn test_put_and_reopen() {
        let tmp = TempDir::new().unwrap();
        let store = LoroStore::init(tmp.path()).unwrap();

        let product = Product::new("4006381333931".to_string(), Some("ada".to_string()));
        let record = AssetRecord::from(product.clone());
        store.put(&record).unwrap();
        store.save().unwrap();

        let store2 = LoroStore::open(tmp.path()).unwrap();
        assert_eq!(store2.get(&product.envelope.id).unwrap(), Some(record));
        assert_eq!(store2.list().unwrap().len(), 1);
        assert!(store2.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites_status_index() {
        let tmp = TempDir::new().unwrap();
        let store = LoroStore::init(tmp.path()).unwrap();

        let mut comment = Comment::new("p1".to_string(), "hello".to_string(), 1, None);
        store.put(&comment.clone().into()).unwrap();
        comment.envelope.status = Status::Active;
        store.put(&comment.clone().into()).unwrap();

        let loaded = store.get(&comment.envelope.id).unwrap().unwrap();
        assert_eq!(loaded.status(), Status::Active);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_query_ratings_for_target() {
        let tmp = TempDir::new().unwrap();
        let store = LoroStore::init(tmp.path()).unwrap();

        store.put(&Rating::new("p1".to_string(), 40.0, 1, None).into()).unwrap();
        store.put(&Rating::new("p1".to_string(), 60.0, 2, None).into()).unwrap();
        store.put(&Rating::new("p2".to_string(), 90.0, 1, None).into()).unwrap();
        store.put(&Comment::new("p1".to_string(), "x".to_string(), 1, None).into()).unwrap();

        let ratings = store.query_ratings_for("p1").unwrap();
        assert_eq!(ratings.len(), 2);
        assert!(ratings.iter().all(|r| r.target_id == "p1"));
    }

    #[test]
    fn test_reviews_and_votes_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = LoroStore::init(tmp.path()).unwrap();

        let review = Review::open("a1", Utc::now());
        store.put_review(&review).unwrap();
        store.put_review(&Review::open("a2", Utc::now())).unwrap();

        let vote = Vote::new("alice", "c1", VoteKind::Comment, 1, Utc::now());
        store.put_vote(&vote).unwrap();
        store.save().unwrap();

        let store2 = LoroStore::open(tmp.path()).unwrap();
        assert_eq!(store2.reviews_for("a1").unwrap(), vec![review]);
        assert_eq!(store2.vote("alice", "c1").unwrap(), Some(vote));
        assert_eq!(store2.votes_for("c1").unwrap().len(), 1);
        assert!(store2.vote("bob", "c1").unwrap().is_none());
    }

    #[test]
    fn test_users_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = LoroStore::init(tmp.path()).unwrap();

        let mut user = User::person("u1".to_string(), "Ada".to_string());
        user.reputation = 7;
        store.put_user(&user).unwrap();

        assert_eq!(store.get_user("u1").unwrap(), Some(user));
    }

    #[test]
    fn test_corrupt_entry_fails_queries() {
        let tmp = TempDir::new().unwrap();
        let store = LoroStore::init(tmp.path()).unwrap();

        let good = Rating::new("p1".to_string(), 40.0, 1, None);
        let bad = Rating::new("p1".to_string(), 60.0, 1, None);
        store.put(&good.into()).unwrap();
        store.put(&bad.clone().into()).unwrap();

        match store.doc.get_map(ASSETS).get(&bad.envelope.id) {
            Some(ValueOrContainer::Container(loro::Container::Map(entry))) => {
                entry.insert("json", "{not json").unwrap();
            }
            _ => panic!("Expected entry map"),
        }
        store.doc.commit();

        assert!(matches!(
            store.get(&bad.envelope.id),
            Err(GovernanceError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.query_ratings_for("p1"),
            Err(GovernanceError::StorageUnavailable(_))
        ));
        assert!(matches!(store.list(), Err(GovernanceError::StorageUnavailable(_))));
        // other targets are unaffected
        assert!(store.query_ratings_for("p2").unwrap().is_empty());
    }

    #[test]
    fn test_version_hash_changes_on_write() {
        let tmp = TempDir::new().unwrap();
        let store = LoroStore::init(tmp.path()).unwrap();
        let before = store.version_hash();

        store.put(&Product::new("1".to_string(), None).into()).unwrap();
        assert_ne!(before, store.version_hash());
    }
}
