use serde::{Deserialize, Serialize};

use super::{AssetEnvelope, Reviewable, Revision, Scorable, Updatable};
use crate::score::Score;

/// Display data for one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleData {
    /// BCP 47 tag, e.g. "de-AT"
    pub locale: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl LocaleData {
    pub fn new(locale: String, name: String) -> Self {
        Self {
            locale,
            name,
            description: None,
            url: None,
        }
    }
}

/// Insert or replace the entry for `data.locale`, keeping order.
fn upsert_locale(locales: &mut Vec<LocaleData>, data: LocaleData) {
    match locales.iter_mut().find(|l| l.locale == data.locale) {
        Some(existing) => *existing = data,
        None => locales.push(data),
    }
}

fn find_locale<'a>(locales: &'a [LocaleData], locale: &str) -> Option<&'a LocaleData> {
    locales.iter().find(|l| l.locale.eq_ignore_ascii_case(locale))
}

macro_rules! scorable_asset {
    ($ty:ty) => {
        impl Reviewable for $ty {
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

        impl Updatable for $ty {
            fn revision(&self) -> &Revision {
                &self.revision
            }
        }

        impl Scorable for $ty {
            fn score(&self) -> Option<&Score> {
                self.score.as_ref()
            }

            fn set_score(&mut self, score: Option<Score>) {
                self.score = score;
            }
        }
    };
}

/// A purchasable item, identified by its GTIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub envelope: AssetEnvelope,
    #[serde(flatten)]
    pub revision: Revision,
    #[serde(default)]
    pub score: Option<Score>,
    pub gtin: String,
    #[serde(default)]
    pub producer_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub locales: Vec<LocaleData>,
}

impl Product {
    pub fn new(gtin: String, submitted_by: Option<String>) -> Self {
        let envelope = AssetEnvelope::new(submitted_by);
        let revision = Revision::new(envelope.created_at);
        Self {
            envelope,
            revision,
            score: None,
            gtin,
            producer_id: None,
            label_ids: Vec::new(),
            locales: Vec::new(),
        }
    }

    pub fn set_locale(&mut self, data: LocaleData) {
        upsert_locale(&mut self.locales, data);
    }

    pub fn locale(&self, locale: &str) -> Option<&LocaleData> {
        find_locale(&self.locales, locale)
    }
}

/// A manufacturer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    #[serde(flatten)]
    pub envelope: AssetEnvelope,
    #[serde(flatten)]
    pub revision: Revision,
    #[serde(default)]
    pub score: Option<Score>,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub locales: Vec<LocaleData>,
}

impl Producer {
    pub fn new(name: String, submitted_by: Option<String>) -> Self {
        let envelope = AssetEnvelope::new(submitted_by);
        let revision = Revision::new(envelope.created_at);
        Self {
            envelope,
            revision,
            score: None,
            name,
            address: None,
            url: None,
            locales: Vec::new(),
        }
    }

    pub fn set_locale(&mut self, data: LocaleData) {
        upsert_locale(&mut self.locales, data);
    }

    pub fn locale(&self, locale: &str) -> Option<&LocaleData> {
        find_locale(&self.locales, locale)
    }
}

/// A certification or label scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(flatten)]
    pub envelope: AssetEnvelope,
    #[serde(flatten)]
    pub revision: Revision,
    #[serde(default)]
    pub score: Option<Score>,
    pub version: String,
    #[serde(default)]
    pub locales: Vec<LocaleData>,
}

impl Label {
    pub fn new(version: String, submitted_by: Option<String>) -> Self {
        let envelope = AssetEnvelope::new(submitted_by);
        let revision = Revision::new(envelope.created_at);
        Self {
            envelope,
            revision,
            score: None,
            version,
            locales: Vec::new(),
        }
    }

    pub fn set_locale(&mut self, data: LocaleData) {
        upsert_locale(&mut self.locales, data);
    }

    pub fn locale(&self, locale: &str) -> Option<&LocaleData> {
        find_locale(&self.locales, locale)
    }
}

scorable_asset!(Product);
scorable_asset!(Producer);
scorable_asset!(Label);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_locale_replaces_in_place() {
        let mut label = Label::new("2.1".to_string(), None);
        label.set_locale(LocaleData::new("en".to_string(), "EU Ecolabel".to_string()));
        label.set_locale(LocaleData::new("de".to_string(), "EU Umweltzeichen".to_string()));
        label.set_locale(LocaleData::new("en".to_string(), "EU Eco-label".to_string()));

        assert_eq!(label.locales.len(), 2);
        assert_eq!(label.locales[0].locale, "en");
        assert_eq!(label.locales[0].name, "EU Eco-label");
        assert_eq!(label.locale("DE").unwrap().name, "EU Umweltzeichen");
        assert!(label.locale("fr").is_none());
    }

    #[test]
    fn test_new_product_is_unscored_and_preliminary() {
        let product = Product::new("4006381333931".to_string(), Some("bob".to_string()));
        assert!(product.score.is_none());
        assert_eq!(product.envelope.status, super::super::Status::Preliminary);
        assert_eq!(product.revision.updated_at, product.envelope.created_at);
    }
}
