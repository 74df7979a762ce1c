//! GitHub REST client implementation.
//!
//! Uses unauthenticated requests against `/users/{name}` and
//! `/users/{login}/repos`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use repowatch_core::constants::{
    DEFAULT_GITHUB_API_URL, DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_USER_AGENT,
};
use repowatch_core::error::{ForgeError, Result};
use repowatch_core::{ForgeApi, Repo, User};

/// GitHub client configuration.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GithubConfig {
    /// API root (e.g. "https://api.github.com")
    pub base_url: String,
    /// User agent header value
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Repositories requested per page
    pub per_page: u8,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GITHUB_API_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            per_page: 100,
        }
    }
}

impl GithubConfig {
    /// Creates config for an API root other than the public one.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Reads `GITHUB_API_URL`, falling back to the public API.
    pub fn from_env() -> Self {
        std::env::var("GITHUB_API_URL")
            .map(Self::new)
            .unwrap_or_default()
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// GitHub REST client.
pub struct GithubClient {
    base_url: Url,
    per_page: u8,
    http_client: reqwest::Client,
}

impl GithubClient {
    /// Creates a client for the public API.
    pub fn new() -> Result<Self> {
        Self::with_config(GithubConfig::default())
    }

    /// Creates a client with the given config.
    pub fn with_config(config: GithubConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ForgeError::Config(format!("Invalid base URL '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ForgeError::Config(format!(
                "Base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ForgeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            per_page: config.per_page,
            http_client,
        })
    }

    /// Builds `{base}/seg1/seg2/...`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ForgeError::Config("Base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, resource: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ForgeError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, resource, "GitHub request failed");
            return Err(ForgeError::Network(format!("HTTP {}: {}", status, text.trim())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ForgeApi for GithubClient {
    #[instrument(skip(self))]
    async fn fetch_user(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ForgeError::NotFound("users/".into()));
        }

        let url = self.endpoint(&["users", name])?;
        let user: User = self.get_json(url, &format!("users/{}", name)).await?;
        debug!(login = %user.login, "Fetched user");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn fetch_repos(&self, login: &str) -> Result<Vec<Repo>> {
        let login = login.trim();
        if login.is_empty() {
            return Err(ForgeError::NotFound("users//repos".into()));
        }

        let mut url = self.endpoint(&["users", login, "repos"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &self.per_page.to_string());
        let repos: Vec<Repo> = self
            .get_json(url, &format!("users/{}/repos", login))
            .await?;
        debug!(count = repos.len(), "Fetched repositories");
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GithubClient {
        GithubClient::with_config(GithubConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/Octocat"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "octocat",
                "id": 1,
                "name": "The Octocat",
                "bio": "mascot",
                "public_repos": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let user = assert_ok!(client.fetch_user("Octocat").await);
        assert_eq!(user.login, "octocat");
        assert_eq!(user.bio.as_deref(), Some("mascot"));
    }

    #[tokio::test]
    async fn test_fetch_repos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/acme/repos"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "repo1", "full_name": "acme/repo1", "stargazers_count": 3 },
                { "name": "repo2", "full_name": "acme/repo2", "fork": true }
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let repos = assert_ok!(client.fetch_repos("acme").await);
        let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["repo1", "repo2"]);
        assert!(repos[1].fork);
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = assert_err!(client.fetch_user("ghost").await);
        assert_eq!(err, ForgeError::NotFound("users/ghost".into()));
    }

    #[tokio::test]
    async fn test_server_error_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/acme/repos"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = assert_err!(client.fetch_repos("acme").await);
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/acme"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = assert_err!(client.fetch_user("acme").await);
        assert!(matches!(err, ForgeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network() {
        let client = GithubClient::with_config(GithubConfig::new("http://127.0.0.1:9").with_timeout(2))
            .unwrap();
        let err = assert_err!(client.fetch_user("acme").await);
        assert!(matches!(err, ForgeError::Network(_)));
    }

    #[tokio::test]
    async fn test_empty_name_is_not_found() {
        let client = GithubClient::new().unwrap();
        let err = assert_err!(client.fetch_repos("  ").await);
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = GithubClient::with_config(GithubConfig::new("https://ghe.example.com/api/v3/")).unwrap();
        let url = client.endpoint(&["users", "a b"]).unwrap();
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/users/a%20b");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            GithubClient::with_config(GithubConfig::new("not a url")),
            Err(ForgeError::Config(_))
        ));
        assert!(matches!(
            GithubClient::with_config(GithubConfig::new("mailto:someone@example.com")),
            Err(ForgeError::Config(_))
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config = GithubConfig::default().with_timeout(5);
        assert_eq!(config.base_url, DEFAULT_GITHUB_API_URL);
        assert_eq!(config.timeout_seconds, 5);
        assert!(config.user_agent.starts_with("repowatch/"));
    }

    #[test]
    fn test_config_from_env_falls_back() {
        if std::env::var("GITHUB_API_URL").is_err() {
            assert_eq!(GithubConfig::from_env().base_url, DEFAULT_GITHUB_API_URL);
        }
    }
}
