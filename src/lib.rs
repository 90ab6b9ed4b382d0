//! Content governance for a crowdsourced product-sustainability platform:
//! moderation lifecycle, weighted score aggregation, votes, flags and
//! reputation.

pub mod asset;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod reputation;
pub mod review;
pub mod score;
pub mod storage;
pub mod user;
pub mod voting;

pub use asset::{AssetKind, AssetRecord, Reviewable, Scorable, Status, Updatable};
pub use cache::ScoreIndex;
pub use config::GovernanceConfig;
pub use engine::Engine;
pub use error::{GovernanceError, Rejection, Result};
pub use events::{EventSink, GovernanceEvent};
pub use storage::{AssetStore, LoroStore, MemoryStore};
