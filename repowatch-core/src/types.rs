//! Domain types returned by the forge API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A forge user profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Canonical login, used as the key for repository lookups
    pub login: String,
    /// Numeric account id
    #[serde(default)]
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Profile biography
    #[serde(default)]
    pub bio: Option<String>,
    /// Number of public repositories
    #[serde(default)]
    pub public_repos: u32,
    /// Profile page
    #[serde(default)]
    pub html_url: Option<String>,
    /// Account creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Creates a user with only a login set.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            id: 0,
            name: None,
            bio: None,
            public_repos: 0,
            html_url: None,
            created_at: None,
        }
    }

    /// Bio text for display, with a placeholder when the profile has none.
    pub fn bio_or_placeholder(&self) -> &str {
        self.bio.as_deref().unwrap_or("not available")
    }
}

/// A repository owned by a forge user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    /// Short name
    pub name: String,
    /// Numeric id
    #[serde(default)]
    pub id: u64,
    /// `owner/name`
    #[serde(default)]
    pub full_name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Repository page
    #[serde(default)]
    pub html_url: Option<String>,
    /// Primary language
    #[serde(default)]
    pub language: Option<String>,
    /// Star count
    #[serde(default)]
    pub stargazers_count: u32,
    /// Whether this is a fork
    #[serde(default)]
    pub fork: bool,
}

impl Repo {
    /// Creates a repository with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: 0,
            full_name: String::new(),
            description: None,
            html_url: None,
            language: None,
            stargazers_count: 0,
            fork: false,
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.full_name.is_empty() {
            f.write_str(&self.name)
        } else {
            f.write_str(&self.full_name)
        }
    }
}

/// Key of one cached logical resource.
///
/// Each cached stream owns exactly one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKey {
    /// The resolved user profile
    User,
    /// The repository list of the resolved user
    Repos,
}

impl CacheKey {
    /// Constant string form.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::User => "USER",
            CacheKey::Repos => "REPOS",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
