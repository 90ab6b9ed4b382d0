//! Fire-and-forget governance events.
//!
//! Sinks only observe: the engine behaves the same with or without one.

use std::sync::Mutex;

use serde::Serialize;

use crate::asset::{AssetKind, Status};
use crate::review::ReviewDecision;
use crate::score::Score;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GovernanceEvent {
    AssetTransitioned {
        asset_id: String,
        kind: AssetKind,
        from: Option<Status>,
        to: Status,
    },
    ReviewSubmitted {
        review_id: String,
        asset_id: String,
        decision: ReviewDecision,
    },
    ScoreRecomputed {
        asset_id: String,
        score: Option<Score>,
    },
    ReReviewTriggered {
        asset_id: String,
        reason: String,
    },
    ReputationAdjusted {
        user_id: String,
        delta: i32,
        reputation: i32,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &GovernanceEvent);
}

/// Logs every event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &GovernanceEvent) {
        match event {
            GovernanceEvent::AssetTransitioned {
                asset_id,
                kind,
                from,
                to,
            } => {
                let from = from.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
                tracing::info!(%asset_id, %kind, %from, %to, "asset transitioned");
            }
            GovernanceEvent::ReviewSubmitted {
                review_id,
                asset_id,
                decision,
            } => {
                tracing::info!(%review_id, %asset_id, %decision, "review submitted");
            }
            GovernanceEvent::ScoreRecomputed { asset_id, score } => match score {
                Some(score) => tracing::info!(
                    %asset_id,
                    value = score.value,
                    total_weight = score.total_weight,
                    ratings = score.rating_count,
                    "score recomputed"
                ),
                None => tracing::info!(%asset_id, "score recomputed: unscored"),
            },
            GovernanceEvent::ReReviewTriggered { asset_id, reason } => {
                tracing::warn!(%asset_id, %reason, "re-review triggered");
            }
            GovernanceEvent::ReputationAdjusted {
                user_id,
                delta,
                reputation,
            } => {
                tracing::info!(%user_id, delta, reputation, "reputation adjusted");
            }
        }
    }
}

/// Keeps every event in memory, for tests and embedders that poll.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GovernanceEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GovernanceEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &GovernanceEvent) {
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}
