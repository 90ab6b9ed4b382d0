//! Contributor profiles.
//!
//! Identity and authentication live outside the engine; a `User` here is the
//! public profile plus the reputation the engine maintains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub passport_nr_hash: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Organization {
    pub org_name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UserProfile {
    Person(Person),
    Organization(Organization),
    /// An organization that produces or sells goods
    Company(Organization),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub reputation: i32,
    #[serde(default)]
    pub last_comment_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_comment_deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub public_email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub profile: UserProfile,
}

/// Profile fields a user may change themselves. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub avatar_url: Option<String>,
    pub public_email: Option<String>,
    pub bio: Option<String>,
    pub real_name: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
}

impl User {
    pub fn new(id: String, name: String, profile: UserProfile) -> Self {
        Self {
            id,
            name,
            created_at: Utc::now(),
            reputation: 0,
            last_comment_at: None,
            last_comment_deleted_at: None,
            avatar_url: None,
            public_email: None,
            bio: None,
            profile,
        }
    }

    pub fn person(id: String, name: String) -> Self {
        Self::new(id, name, UserProfile::Person(Person::default()))
    }

    pub fn is_organization(&self) -> bool {
        matches!(
            self.profile,
            UserProfile::Organization(_) | UserProfile::Company(_)
        )
    }

    /// Apply the provided fields. Person-only fields are ignored for
    /// organizations.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(avatar_url) = update.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
        if let Some(public_email) = update.public_email {
            self.public_email = Some(public_email);
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }

        match &mut self.profile {
            UserProfile::Person(person) => {
                if let Some(real_name) = update.real_name {
                    person.real_name = Some(real_name);
                }
                if let Some(url) = update.url {
                    person.url = Some(url);
                }
                if let Some(location) = update.location {
                    person.location = Some(location);
                }
            }
            UserProfile::Organization(org) | UserProfile::Company(org) => {
                if let Some(url) = update.url {
                    org.url = Some(url);
                }
            }
        }
    }

    /// Add `delta` to the reputation and return the new value.
    pub fn adjust_reputation(&mut self, delta: i32) -> i32 {
        self.reputation = self.reputation.saturating_add(delta);
        self.reputation
    }
}
