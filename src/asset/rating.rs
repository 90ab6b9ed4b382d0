use serde::{Deserialize, Serialize};

use super::{AssetEnvelope, Reviewable, Status};

/// A single user's score for a product, producer or label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(flatten)]
    pub envelope: AssetEnvelope,
    /// The scorable asset being rated
    pub target_id: String,
    /// 0..=100
    pub score: f64,
    /// Trust of the rater at submission time
    pub weight: i32,
}

impl Rating {
    pub fn new(target_id: String, score: f64, weight: i32, submitted_by: Option<String>) -> Self {
        Self {
            envelope: AssetEnvelope::new(submitted_by),
            target_id,
            score,
            weight,
        }
    }

    /// Only active ratings are aggregated.
    pub fn is_contributing(&self) -> bool {
        self.envelope.status == Status::Active
    }
}

impl Reviewable for Rating {
    fn envelope(&self) -> &AssetEnvelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut AssetEnvelope {
        &mut self.envelope
    }
}
