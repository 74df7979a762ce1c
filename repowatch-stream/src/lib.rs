//! # repowatch streams
//!
//! Stale-while-revalidate outcome streams for forge data.
//!
//! - [`OutcomeChannel`]: multi-subscriber channel replaying the last outcome
//! - [`CachedStream`]: one cache entry bound to one channel, with the
//!   publish-or-refresh policy
//! - [`FetchCoordinator`]: at most one fetch in flight per key; superseded
//!   results are dropped
//! - [`Repository`]: the user stream and repository stream, wired so that a
//!   resolved user refreshes its repositories
//!
//! ## Example
//!
//! ```rust,ignore
//! let repository = Repository::new(Arc::new(GithubClient::new()));
//! let mut repos = repository.subscribe_repos();
//! repository.ping_repo("octocat");
//! while let Some(outcome) = repos.recv().await {
//!     println!("{}", outcome.kind());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cached_stream;
mod channel;
mod config;
mod coordinator;
mod repository;

#[cfg(test)]
mod stub;

pub use cached_stream::{CachedStream, OutcomeCache, RefreshDecision};
pub use channel::{OutcomeChannel, Subscription};
pub use config::{RepositoryConfig, StreamConfig};
pub use coordinator::{FetchCoordinator, FetchHandle, FetchState};
pub use repository::Repository;
