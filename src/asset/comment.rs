use serde::{Deserialize, Serialize};

use super::{AssetEnvelope, Reviewable};
use crate::voting::Flag;

/// A community comment. Comments are moderated by status only; their text
/// is never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(flatten)]
    pub envelope: AssetEnvelope,
    pub target_id: String,
    pub text: String,
    pub weight: i32,
    #[serde(default)]
    pub flag: Flag,
}

impl Comment {
    pub fn new(target_id: String, text: String, weight: i32, submitted_by: Option<String>) -> Self {
        Self {
            envelope: AssetEnvelope::new(submitted_by),
            target_id,
            text,
            weight,
            flag: Flag::default(),
        }
    }
}

impl Reviewable for Comment {
    fn envelope(&self) -> &AssetEnvelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut AssetEnvelope {
        &mut self.envelope
    }
}
