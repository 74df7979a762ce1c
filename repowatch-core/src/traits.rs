//! Common traits for repowatch.
//!
//! The fetch interface is the only seam between the caching engine and the
//! remote forge, so tests can substitute a stub for the HTTP client.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Repo, User};

// ═══════════════════════════════════════════════════════════════════════════════
// FORGE API TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for fetching profiles and repositories from a code forge.
///
/// Implementations own transport, parsing, and any retry policy. Calls may be
/// abandoned at any await point when a newer fetch supersedes them.
#[async_trait]
pub trait ForgeApi: Send + Sync {
    /// Resolves a user name to its profile.
    ///
    /// The returned `User::login` is the canonical key for
    /// [`ForgeApi::fetch_repos`] and may differ from `name` in case.
    async fn fetch_user(&self, name: &str) -> Result<User>;

    /// Lists the public repositories of a user.
    async fn fetch_repos(&self, login: &str) -> Result<Vec<Repo>>;
}
