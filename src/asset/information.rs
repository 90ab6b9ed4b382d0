use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AssetEnvelope, Reviewable, Revision, Updatable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InfoCategory {
    #[default]
    GeneralInformation,
    LifeCycleAnalysis,
    ExternalCosts,
    StudyOrPaper,
    PressArticle,
    InvestigativeReport,
    CorporateSocialResponsibility,
    Jurisdiction,
    Other,
}

impl std::fmt::Display for InfoCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfoCategory::GeneralInformation => write!(f, "general_information"),
            InfoCategory::LifeCycleAnalysis => write!(f, "life_cycle_analysis"),
            InfoCategory::ExternalCosts => write!(f, "external_costs"),
            InfoCategory::StudyOrPaper => write!(f, "study_or_paper"),
            InfoCategory::PressArticle => write!(f, "press_article"),
            InfoCategory::InvestigativeReport => write!(f, "investigative_report"),
            InfoCategory::CorporateSocialResponsibility => {
                write!(f, "corporate_social_responsibility")
            }
            InfoCategory::Jurisdiction => write!(f, "jurisdiction"),
            InfoCategory::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for InfoCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "general_information" | "general" => Ok(InfoCategory::GeneralInformation),
            "life_cycle_analysis" | "lca" => Ok(InfoCategory::LifeCycleAnalysis),
            "external_costs" => Ok(InfoCategory::ExternalCosts),
            "study_or_paper" | "study" => Ok(InfoCategory::StudyOrPaper),
            "press_article" | "press" => Ok(InfoCategory::PressArticle),
            "investigative_report" => Ok(InfoCategory::InvestigativeReport),
            "corporate_social_responsibility" | "csr" => {
                Ok(InfoCategory::CorporateSocialResponsibility)
            }
            "jurisdiction" => Ok(InfoCategory::Jurisdiction),
            "other" => Ok(InfoCategory::Other),
            _ => Err(format!("Invalid info category: {}", s)),
        }
    }
}

/// A citation backing a piece of information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub retrieved_at: Option<DateTime<Utc>>,
}

/// A documented claim about a product, producer or label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Information {
    #[serde(flatten)]
    pub envelope: AssetEnvelope,
    #[serde(flatten)]
    pub revision: Revision,
    /// The asset this information documents
    pub target_id: String,
    pub title: String,
    pub category: InfoCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub weight: i32,
}

impl Information {
    pub fn new(
        target_id: String,
        title: String,
        category: InfoCategory,
        weight: i32,
        submitted_by: Option<String>,
    ) -> Self {
        let envelope = AssetEnvelope::new(submitted_by);
        let revision = Revision::new(envelope.created_at);
        Self {
            envelope,
            revision,
            target_id,
            title,
            category,
            description: None,
            sources: Vec::new(),
            weight,
        }
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

impl Reviewable for Information {
    fn envelope(&self) -> &AssetEnvelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut AssetEnvelope {
        &mut self.envelope
    }

    fn revision_mut(&mut self) -> Option<&mut Revision> {
        Some(&mut self.revision)
    }
}

impl Updatable for Information {
    fn revision(&self) -> &Revision {
        &self.revision
    }
}
