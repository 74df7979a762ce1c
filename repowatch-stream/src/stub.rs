//! In-memory forge used by the unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use repowatch_core::error::{ForgeError, Result};
use repowatch_core::{ForgeApi, Repo, User};

/// Canned responses with optional gates to control completion order.
#[derive(Default)]
pub(crate) struct StubForge {
    users: HashMap<String, Result<User>>,
    repos: HashMap<String, Result<Vec<Repo>>>,
    repo_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    user_calls: Mutex<Vec<String>>,
    repo_calls: Mutex<Vec<String>>,
}

impl StubForge {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_user(mut self, name: &str, result: Result<User>) -> Self {
        self.users.insert(name.to_string(), result);
        self
    }

    pub(crate) fn with_repos(mut self, login: &str, result: Result<Vec<Repo>>) -> Self {
        self.repos.insert(login.to_string(), result);
        self
    }

    /// Holds the next `fetch_repos(login)` until the sender fires or drops.
    pub(crate) fn gate_repos(&self, login: &str) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.repo_gates.lock().insert(login.to_string(), gate);
        release
    }

    pub(crate) fn user_calls(&self) -> Vec<String> {
        self.user_calls.lock().clone()
    }

    pub(crate) fn repo_calls(&self) -> Vec<String> {
        self.repo_calls.lock().clone()
    }
}

#[async_trait]
impl ForgeApi for StubForge {
    async fn fetch_user(&self, name: &str) -> Result<User> {
        self.user_calls.lock().push(name.to_string());
        self.users
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(ForgeError::NotFound(format!("users/{}", name))))
    }

    async fn fetch_repos(&self, login: &str) -> Result<Vec<Repo>> {
        self.repo_calls.lock().push(login.to_string());
        let gate = self.repo_gates.lock().remove(login);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.repos
            .get(login)
            .cloned()
            .unwrap_or_else(|| Err(ForgeError::NotFound(format!("users/{}/repos", login))))
    }
}
