//! GitHub release creation over the REST API.
//!
//! [`ReleaseHost`] is the seam between the publishing loop and the remote
//! service; [`GitHubReleases`] is the production implementation using a
//! blocking `reqwest` client.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version requested on every call.
const API_VERSION: &str = "2022-11-28";

/// Validation code GitHub reports when a release for the tag exists.
const ALREADY_EXISTS_CODE: &str = "already_exists";

/// Errors from creating a release.
#[derive(Error, Debug)]
pub enum PublishError {
    /// A release for the tag already exists.
    #[error("a release for tag {tag} already exists")]
    AlreadyExists {
        /// The tag name.
        tag: String,
    },

    /// The API answered with an error status.
    #[error("GitHub API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("request to GitHub failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result alias for publishing operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// A release to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    /// Existing tag the release is attached to.
    pub tag_name: String,
    /// Display name.
    pub name: String,
    /// Markdown body.
    pub body: String,
    /// Always `false` for releases created from tags.
    pub draft: bool,
    /// Whether the version is a prerelease.
    pub prerelease: bool,
}

/// A service that can create releases.
pub trait ReleaseHost {
    /// Create a release and return its URL.
    fn create_release(&self, release: &NewRelease) -> PublishResult<String>;
}

/// Repository coordinates and credentials for [`GitHubReleases`].
#[derive(Clone)]
pub struct GitHubRepo {
    /// API base URL without trailing slash.
    pub api_url: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    token: String,
}

impl GitHubRepo {
    /// Coordinates for `owner/repo` authenticated with `token`.
    pub fn new(
        api_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    fn releases_url(&self) -> String {
        format!("{}/repos/{}/{}/releases", self.api_url, self.owner, self.repo)
    }
}

impl std::fmt::Debug for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubRepo")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

/// Creates releases through `POST /repos/{owner}/{repo}/releases`.
#[derive(Debug)]
pub struct GitHubReleases {
    client: Client,
    repo: GitHubRepo,
}

impl GitHubReleases {
    /// Build a client for the given repository.
    pub fn new(repo: GitHubRepo) -> PublishResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, repo })
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRelease {
    html_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: Option<String>,
}

impl ReleaseHost for GitHubReleases {
    #[instrument(
        skip(self, release),
        fields(tag = %release.tag_name, owner = %self.repo.owner, repo = %self.repo.repo)
    )]
    fn create_release(&self, release: &NewRelease) -> PublishResult<String> {
        let response = self
            .client
            .post(self.repo.releases_url())
            .bearer_auth(&self.repo.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(release)
            .send()?;

        let status = response.status();
        debug!(status = status.as_u16(), "create release response");

        if status.is_success() {
            let created: CreatedRelease = response.json()?;
            return Ok(created.html_url);
        }

        let text = response.text().unwrap_or_default();
        Err(classify_error(status, &text, &release.tag_name))
    }
}

/// Map an error response to a [`PublishError`].
///
/// GitHub reports a duplicate release as `422` with an `already_exists`
/// validation error.
fn classify_error(status: StatusCode, body: &str, tag: &str) -> PublishError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();

    let exists = status == StatusCode::UNPROCESSABLE_ENTITY
        && parsed
            .errors
            .iter()
            .any(|e| e.code.as_deref() == Some(ALREADY_EXISTS_CODE));
    if exists {
        return PublishError::AlreadyExists {
            tag: tag.to_string(),
        };
    }

    let message = if parsed.message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        parsed.message
    };
    PublishError::Api {
        status: status.as_u16(),
        message,
    }
}
