//! # repowatch core
//!
//! Core types, errors, and traits shared by the repowatch crates.
//!
//! - **Outcome**: the Empty / Progress / Success / Failure lifecycle of a
//!   fetched value, plus projections for rendering
//! - **Errors**: the fetch error taxonomy
//! - **Types**: `User`, `Repo`, and the typed `CacheKey`
//! - **Traits**: the `ForgeApi` fetch interface
//!
//! ## Example
//!
//! ```rust
//! use repowatch_core::{Outcome, Visibility};
//!
//! let outcome: Outcome<Vec<String>> = Outcome::loading(true);
//! assert_eq!(outcome.loading_visibility(), Visibility::Visible);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod outcome;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{ForgeError, Result};
pub use outcome::{any_error_visible, Outcome, Visibility};
pub use traits::ForgeApi;
pub use types::{CacheKey, Repo, User};
