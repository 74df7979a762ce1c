//! GitHub client for repowatch.
//!
//! Implements [`repowatch_core::ForgeApi`] over the public GitHub REST API.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod github;

pub use github::{GithubClient, GithubConfig};
