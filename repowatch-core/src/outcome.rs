//! The lifecycle state of one asynchronously fetched value.
//!
//! An [`Outcome`] is never mutated in place: each transition constructs a new
//! value which replaces the cached one and is pushed to subscribers.
//!
//! The projection helpers fold the four-way union into the simpler shapes a
//! renderer needs (a string, a flag, a [`Visibility`]).

use crate::error::ForgeError;

/// Lifecycle state of one logical value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Outcome<T> {
    /// No value has been fetched yet.
    #[default]
    Empty,
    /// A fetch is in flight (`true`) or has just ended (`false`).
    Progress {
        /// Whether a fetch is currently running.
        loading: bool,
    },
    /// The last fetch succeeded.
    Success {
        /// The fetched value.
        value: T,
    },
    /// The last fetch failed. Carries no earlier success data.
    Failure {
        /// The error reported by the fetch interface.
        error: ForgeError,
    },
}

/// Whether a piece of rendered state should be shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Show it.
    Visible,
    /// Hide it.
    Gone,
}

impl Visibility {
    /// `Visible` for `true`, `Gone` for `false`.
    pub fn from_flag(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Gone
        }
    }

    /// Returns true for `Visible`.
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

impl<T> Outcome<T> {
    /// Creates a `Progress` outcome.
    pub fn loading(loading: bool) -> Self {
        Outcome::Progress { loading }
    }

    /// Creates a `Success` outcome.
    pub fn success(value: T) -> Self {
        Outcome::Success { value }
    }

    /// Creates a `Failure` outcome.
    pub fn failure(error: ForgeError) -> Self {
        Outcome::Failure { error }
    }

    /// Creates an `Empty` outcome.
    pub fn empty() -> Self {
        Outcome::Empty
    }

    /// True only for `Progress { loading: true }`.
    pub fn is_loading(&self) -> bool {
        matches!(self, Outcome::Progress { loading: true })
    }

    /// True for any `Progress` outcome.
    pub fn is_progress(&self) -> bool {
        matches!(self, Outcome::Progress { .. })
    }

    /// True for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// True for `Failure`.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// True for `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    /// True for `Success` and `Failure`, the states a fetch ends in.
    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    /// The success value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success { value } => Some(value),
            _ => None,
        }
    }

    /// The failure error, if any.
    pub fn error(&self) -> Option<&ForgeError> {
        match self {
            Outcome::Failure { error } => Some(error),
            _ => None,
        }
    }

    /// Transforms the success value, keeping every other variant.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Empty => Outcome::Empty,
            Outcome::Progress { loading } => Outcome::Progress { loading },
            Outcome::Success { value } => Outcome::Success { value: f(value) },
            Outcome::Failure { error } => Outcome::Failure { error },
        }
    }

    /// Short variant name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Empty => "empty",
            Outcome::Progress { loading: true } => "loading",
            Outcome::Progress { loading: false } => "idle",
            Outcome::Success { .. } => "success",
            Outcome::Failure { .. } => "failure",
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PROJECTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Maps a success value through `f`; every other state yields `non_success`.
    pub fn map_success<O>(&self, non_success: O, f: impl FnOnce(&T) -> O) -> O {
        match self {
            Outcome::Success { value } => f(value),
            _ => non_success,
        }
    }

    /// Maps a failure through `f`; every other state yields `non_error`.
    pub fn map_error<O>(&self, non_error: O, f: impl FnOnce(&ForgeError) -> O) -> O {
        match self {
            Outcome::Failure { error } => f(error),
            _ => non_error,
        }
    }

    /// Maps the loading flag of a `Progress` through `f`; every other state
    /// yields `non_loading`.
    pub fn map_loading<O>(&self, non_loading: O, f: impl FnOnce(bool) -> O) -> O {
        match self {
            Outcome::Progress { loading } => f(*loading),
            _ => non_loading,
        }
    }

    /// `Visible` while a fetch is running.
    pub fn loading_visibility(&self) -> Visibility {
        self.map_loading(Visibility::Gone, Visibility::from_flag)
    }

    /// `Visible` for a failure.
    pub fn error_visibility(&self) -> Visibility {
        self.map_error(Visibility::Gone, |_| Visibility::Visible)
    }

    /// `Visible` for a success.
    pub fn success_visibility(&self) -> Visibility {
        self.map_success(Visibility::Gone, |_| Visibility::Visible)
    }
}

/// `Visible` if any of the given error flags is set.
///
/// Combines the error state of several streams into one indicator.
pub fn any_error_visible(visibilities: &[Visibility]) -> Visibility {
    Visibility::from_flag(visibilities.iter().any(|v| v.is_visible()))
}
