mod sqlite_cache;

pub use sqlite_cache::{QueuedReview, RankedAsset, ScoreIndex};
