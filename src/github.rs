//! Display-name lookup for `/avatar/github/:username`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("avatar-server/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("GitHub API rate limit exceeded")]
    RateLimitExceeded,

    #[error("GitHub API returned status: {0}")]
    Status(u16),

    #[error("error while fetching GitHub user: {0}")]
    Transport(String),

    #[error("error parsing GitHub response: {0}")]
    Decode(String),
}

/// Resolves an external username into a display name.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Result<String, ProfileError>;
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GithubResolver {
    client: reqwest::Client,
    api_url: String,
}

impl GithubResolver {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, ProfileError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProfileError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Display name from a decoded profile, falling back to the username.
fn display_name(user: GithubUser, username: &str) -> String {
    user.name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| username.to_string())
}

#[async_trait]
impl ProfileResolver for GithubResolver {
    async fn resolve(&self, username: &str) -> Result<String, ProfileError> {
        let url = format!("{}/users/{}", self.api_url, username);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProfileError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let exhausted = response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|v| v.as_bytes() == b"0");
            if status == StatusCode::FORBIDDEN && exhausted {
                return Err(ProfileError::RateLimitExceeded);
            }
            return Err(ProfileError::Status(status.as_u16()));
        }

        let user: GithubUser = response
            .json()
            .await
            .map_err(|e| ProfileError::Decode(e.to_string()))?;

        Ok(display_name(user, username))
    }
}
