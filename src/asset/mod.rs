//! The lifecycle envelope shared by every moderated entity.
//!
//! Entities embed an [`AssetEnvelope`] (and, when their content can be
//! revised, a [`Revision`]) by value. Capabilities are expressed through the
//! [`Reviewable`], [`Updatable`] and [`Scorable`] traits instead of a chain
//! of base records.

mod comment;
mod information;
mod product;
mod rating;

pub use comment::Comment;
pub use information::{InfoCategory, Information, Source};
pub use product::{Label, LocaleData, Producer, Product};
pub use rating::Rating;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GovernanceError, Result};
use crate::score::Score;

/// Lifecycle stage of a reviewable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Preliminary,
    Active,
    Outdated,
    Deleted,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Preliminary,
        Status::Active,
        Status::Outdated,
        Status::Deleted,
        Status::Rejected,
    ];

    /// Numeric code used by legacy stores (1-based).
    pub fn code(self) -> i32 {
        match self {
            Status::Preliminary => 1,
            Status::Active => 2,
            Status::Outdated => 3,
            Status::Deleted => 4,
            Status::Rejected => 5,
        }
    }
}

impl TryFrom<i32> for Status {
    type Error = String;

    fn try_from(code: i32) -> std::result::Result<Self, Self::Error> {
        Status::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| format!("Invalid status code: {}", code))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Preliminary => write!(f, "preliminary"),
            Status::Active => write!(f, "active"),
            Status::Outdated => write!(f, "outdated"),
            Status::Deleted => write!(f, "deleted"),
            Status::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preliminary" => Ok(Status::Preliminary),
            "active" => Ok(Status::Active),
            "outdated" => Ok(Status::Outdated),
            "deleted" => Ok(Status::Deleted),
            "rejected" => Ok(Status::Rejected),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// True for statuses with no outbound transitions.
pub fn is_terminal(status: Status) -> bool {
    matches!(status, Status::Deleted | Status::Rejected)
}

/// The lifecycle table. A move to the current status is always allowed and
/// is a no-op.
pub fn can_transition(from: Status, to: Status, updatable: bool) -> bool {
    use Status::*;

    if from == to {
        return true;
    }
    match (from, to) {
        (Preliminary, Active) | (Preliminary, Rejected) => true,
        (Active, Outdated) => updatable,
        (Active, Preliminary) => true,
        (Active, Deleted) | (Preliminary, Deleted) => true,
        _ => false,
    }
}

/// Return a copy of `asset` moved to `to`.
///
/// Fails with `InvalidTransition` unless the move is in the lifecycle table.
/// Updatable assets get their `updated_at` refreshed.
pub fn transition<A: Reviewable>(asset: &A, to: Status, now: DateTime<Utc>) -> Result<A> {
    let from = asset.status();
    let mut next = asset.clone();
    if !can_transition(from, to, next.revision_mut().is_some()) {
        return Err(GovernanceError::InvalidTransition { from, to });
    }
    if from == to {
        return Ok(next);
    }

    next.envelope_mut().status = to;
    if let Some(revision) = next.revision_mut() {
        revision.updated_at = now;
    }
    Ok(next)
}

/// Identity, creation time and status of a moderated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEnvelope {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: Status,
    pub submitted_by: Option<String>,
}

impl AssetEnvelope {
    pub fn new(submitted_by: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            status: Status::Preliminary,
            submitted_by,
        }
    }
}

/// Revision metadata carried by updatable assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub change_reason: Option<String>,
    /// Id of the version this one replaced
    #[serde(default)]
    pub supersedes: Option<String>,
}

impl Revision {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            updated_at: at,
            change_reason: None,
            supersedes: None,
        }
    }
}

pub trait Reviewable: Clone {
    fn envelope(&self) -> &AssetEnvelope;
    fn envelope_mut(&mut self) -> &mut AssetEnvelope;

    /// `Some` only for assets that can be revised.
    fn revision_mut(&mut self) -> Option<&mut Revision> {
        None
    }

    fn id(&self) -> &str {
        &self.envelope().id
    }

    fn status(&self) -> Status {
        self.envelope().status
    }
}

pub trait Updatable: Reviewable {
    fn revision(&self) -> &Revision;
}

pub trait Scorable: Updatable {
    fn score(&self) -> Option<&Score>;
    fn set_score(&mut self, score: Option<Score>);
}

/// Discriminant of [`AssetRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Product,
    Producer,
    Label,
    Information,
    Comment,
    Rating,
}

impl AssetKind {
    pub const SCORABLE: [AssetKind; 3] = [AssetKind::Product, AssetKind::Producer, AssetKind::Label];

    pub fn is_scorable(self) -> bool {
        Self::SCORABLE.contains(&self)
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Product => write!(f, "product"),
            AssetKind::Producer => write!(f, "producer"),
            AssetKind::Label => write!(f, "label"),
            AssetKind::Information => write!(f, "information"),
            AssetKind::Comment => write!(f, "comment"),
            AssetKind::Rating => write!(f, "rating"),
        }
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "product" => Ok(AssetKind::Product),
            "producer" => Ok(AssetKind::Producer),
            "label" => Ok(AssetKind::Label),
            "information" | "info" => Ok(AssetKind::Information),
            "comment" => Ok(AssetKind::Comment),
            "rating" => Ok(AssetKind::Rating),
            _ => Err(format!("Invalid asset kind: {}", s)),
        }
    }
}

/// Any asset as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetRecord {
    Product(Product),
    Producer(Producer),
    Label(Label),
    Information(Information),
    Comment(Comment),
    Rating(Rating),
}

macro_rules! each_record {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            AssetRecord::Product($inner) => $body,
            AssetRecord::Producer($inner) => $body,
            AssetRecord::Label($inner) => $body,
            AssetRecord::Information($inner) => $body,
            AssetRecord::Comment($inner) => $body,
            AssetRecord::Rating($inner) => $body,
        }
    };
}

impl AssetRecord {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetRecord::Product(_) => AssetKind::Product,
            AssetRecord::Producer(_) => AssetKind::Producer,
            AssetRecord::Label(_) => AssetKind::Label,
            AssetRecord::Information(_) => AssetKind::Information,
            AssetRecord::Comment(_) => AssetKind::Comment,
            AssetRecord::Rating(_) => AssetKind::Rating,
        }
    }

    pub fn score(&self) -> Option<&Score> {
        match self {
            AssetRecord::Product(a) => a.score(),
            AssetRecord::Producer(a) => a.score(),
            AssetRecord::Label(a) => a.score(),
            _ => None,
        }
    }

    /// Returns false when the asset is not scorable.
    pub fn set_score(&mut self, score: Option<Score>) -> bool {
        match self {
            AssetRecord::Product(a) => a.set_score(score),
            AssetRecord::Producer(a) => a.set_score(score),
            AssetRecord::Label(a) => a.set_score(score),
            _ => return false,
        }
        true
    }

    pub fn revision(&self) -> Option<&Revision> {
        match self {
            AssetRecord::Product(a) => Some(a.revision()),
            AssetRecord::Producer(a) => Some(a.revision()),
            AssetRecord::Label(a) => Some(a.revision()),
            AssetRecord::Information(a) => Some(a.revision()),
            AssetRecord::Comment(_) | AssetRecord::Rating(_) => None,
        }
    }

    /// The asset this one is attached to, for ratings, information and comments.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            AssetRecord::Information(a) => Some(&a.target_id),
            AssetRecord::Comment(a) => Some(&a.target_id),
            AssetRecord::Rating(a) => Some(&a.target_id),
            _ => None,
        }
    }

    /// Author-supplied weight, for kinds that carry one.
    pub fn weight(&self) -> Option<i32> {
        match self {
            AssetRecord::Information(a) => Some(a.weight),
            AssetRecord::Comment(a) => Some(a.weight),
            AssetRecord::Rating(a) => Some(a.weight),
            _ => None,
        }
    }

    pub fn submitted_by(&self) -> Option<&str> {
        self.envelope().submitted_by.as_deref()
    }

    /// Short human-readable label for listings.
    pub fn title(&self) -> String {
        match self {
            AssetRecord::Product(a) => a
                .locales
                .first()
                .map(|l| l.name.clone())
                .unwrap_or_else(|| a.gtin.clone()),
            AssetRecord::Producer(a) => a.name.clone(),
            AssetRecord::Label(a) => a
                .locales
                .first()
                .map(|l| l.name.clone())
                .unwrap_or_else(|| a.version.clone()),
            AssetRecord::Information(a) => a.title.clone(),
            AssetRecord::Comment(a) => a.text.chars().take(60).collect(),
            AssetRecord::Rating(a) => format!("{} on {}", a.score, a.target_id),
        }
    }
}

impl Reviewable for AssetRecord {
    fn envelope(&self) -> &AssetEnvelope {
        each_record!(self, a => a.envelope())
    }

    fn envelope_mut(&mut self) -> &mut AssetEnvelope {
        each_record!(self, a => a.envelope_mut())
    }

    fn revision_mut(&mut self) -> Option<&mut Revision> {
        each_record!(self, a => a.revision_mut())
    }
}

impl From<Product> for AssetRecord {
    fn from(a: Product) -> Self {
        AssetRecord::Product(a)
    }
}

impl From<Producer> for AssetRecord {
    fn from(a: Producer) -> Self {
        AssetRecord::Producer(a)
    }
}

impl From<Label> for AssetRecord {
    fn from(a: Label) -> Self {
        AssetRecord::Label(a)
    }
}

impl From<Information> for AssetRecord {
    fn from(a: Information) -> Self {
        AssetRecord::Information(a)
    }
}

impl From<Comment> for AssetRecord {
    fn from(a: Comment) -> Self {
        AssetRecord::Comment(a)
    }
}

impl From<Rating> for AssetRecord {
    fn from(a: Rating) -> Self {
        AssetRecord::Rating(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn product() -> Product {
        Product::new("4006381333931".to_string(), None)
    }

    #[test]
    fn test_status_round_trips_through_str_and_code() {
        for status in Status::ALL {
            assert_eq!(status.to_string().parse::<Status>().unwrap(), status);
            assert_eq!(Status::try_from(status.code()).unwrap(), status);
        }
        assert!(Status::try_from(0).is_err());
        assert!(Status::try_from(6).is_err());
        assert!("archived".parse::<Status>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(is_terminal(Status::Deleted));
        assert!(is_terminal(Status::Rejected));
        assert!(!is_terminal(Status::Preliminary));
        assert!(!is_terminal(Status::Active));
        assert!(!is_terminal(Status::Outdated));
    }

    #[test]
    fn test_terminal_statuses_have_no_outbound_moves() {
        for from in [Status::Deleted, Status::Rejected] {
            for to in Status::ALL {
                assert_eq!(can_transition(from, to, true), from == to);
            }
        }
    }

    #[test]
    fn test_transition_refreshes_updated_at() {
        let asset = product();
        let later = asset.revision.updated_at + Duration::seconds(5);

        let active = transition(&asset, Status::Active, later).unwrap();

        assert_eq!(active.status(), Status::Active);
        assert_eq!(active.revision.updated_at, later);
        // the input is untouched
        assert_eq!(asset.status(), Status::Preliminary);
    }

    #[test]
    fn test_transition_to_same_status_is_noop() {
        let asset = product();
        let later = asset.revision.updated_at + Duration::seconds(5);

        let same = transition(&asset, Status::Preliminary, later).unwrap();
        assert_eq!(same, asset);
    }

    #[test]
    fn test_illegal_transition_fails() {
        let asset = product();
        let result = transition(&asset, Status::Outdated, Utc::now());
        assert!(matches!(
            result,
            Err(GovernanceError::InvalidTransition {
                from: Status::Preliminary,
                to: Status::Outdated
            })
        ));
    }

    #[test]
    fn test_only_updatable_assets_become_outdated() {
        let mut comment = Comment::new("target".to_string(), "nice".to_string(), 1, None);
        comment.envelope.status = Status::Active;
        assert!(transition(&comment, Status::Outdated, Utc::now()).is_err());

        let mut info = Information::new(
            "target".to_string(),
            "LCA".to_string(),
            InfoCategory::LifeCycleAnalysis,
            1,
            None,
        );
        info.envelope.status = Status::Active;
        let outdated = transition(&info, Status::Outdated, Utc::now()).unwrap();
        assert_eq!(outdated.status(), Status::Outdated);
    }

    #[test]
    fn test_record_delegates_to_entity() {
        let rating = Rating::new("p1".to_string(), 70.0, 2, Some("alice".to_string()));
        let id = rating.envelope.id.clone();
        let record = AssetRecord::from(rating);

        assert_eq!(record.kind(), AssetKind::Rating);
        assert_eq!(record.id(), id);
        assert_eq!(record.target_id(), Some("p1"));
        assert_eq!(record.weight(), Some(2));
        assert_eq!(record.submitted_by(), Some("alice"));
        assert!(record.revision().is_none());
        assert_eq!(record.title(), "70 on p1");
    }

    #[test]
    fn test_record_json_is_tagged_by_kind() {
        let record = AssetRecord::from(product());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "product");
        assert_eq!(json["status"], "preliminary");

        let parsed: AssetRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_title_prefers_first_locale() {
        let mut p = product();
        assert_eq!(AssetRecord::from(p.clone()).title(), "4006381333931");

        p.set_locale(LocaleData::new("en".to_string(), "Pencil".to_string()));
        assert_eq!(AssetRecord::from(p).title(), "Pencil");
    }
}
