//! CI environment capture.
//!
//! The process environment is read once, at startup, into a
//! [`CiEnvironment`]. Everything downstream takes that value explicitly, so
//! tests build one from a map instead of mutating the real environment.

use serde::Serialize;

/// Token used to authenticate against the GitHub API.
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
/// Fallback token variable used by the `gh` CLI.
pub const ENV_TOKEN_FALLBACK: &str = "GH_TOKEN";
/// Branch or tag name that triggered the run.
pub const ENV_REF_NAME: &str = "GITHUB_REF_NAME";
/// Event that triggered the run (`push`, `workflow_dispatch`, ...).
pub const ENV_EVENT_NAME: &str = "GITHUB_EVENT_NAME";
/// `owner/repo` of the repository being built.
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
/// Commit being built.
pub const ENV_SHA: &str = "GITHUB_SHA";
/// Base URL of the REST API (differs on GitHub Enterprise).
pub const ENV_API_URL: &str = "GITHUB_API_URL";

/// Values read from the CI environment.
///
/// `Debug` and `Serialize` never expose the token itself.
#[derive(Clone, Default, Serialize)]
pub struct CiEnvironment {
    #[serde(skip)]
    token: Option<String>,
    /// Name of the ref that triggered the run.
    pub ref_name: Option<String>,
    /// Name of the triggering event.
    pub event_name: Option<String>,
    /// `owner/repo` slug.
    pub repository: Option<String>,
    /// Commit being built.
    pub sha: Option<String>,
    /// API base URL.
    pub api_url: Option<String>,
}

impl CiEnvironment {
    /// Capture from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Capture through an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            token: get(ENV_TOKEN).or_else(|| get(ENV_TOKEN_FALLBACK)),
            ref_name: get(ENV_REF_NAME),
            event_name: get(ENV_EVENT_NAME),
            repository: get(ENV_REPOSITORY),
            sha: get(ENV_SHA),
            api_url: get(ENV_API_URL),
        }
    }

    /// The API token, if one was provided.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether a token was provided.
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Split [`Self::repository`] into owner and repo.
    pub fn owner_repo(&self) -> Option<(String, String)> {
        let (owner, repo) = self.repository.as_deref()?.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some((owner.to_string(), repo.to_string()))
    }
}

impl std::fmt::Debug for CiEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CiEnvironment")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ref_name", &self.ref_name)
            .field("event_name", &self.event_name)
            .field("repository", &self.repository)
            .field("sha", &self.sha)
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> CiEnvironment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CiEnvironment::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn reads_github_actions_variables() {
        let ci = env(&[
            ("GITHUB_TOKEN", "ghs_secret"),
            ("GITHUB_REF_NAME", "main"),
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_REPOSITORY", "acme/monorepo"),
            ("GITHUB_SHA", "abc123"),
        ]);
        assert_eq!(ci.token(), Some("ghs_secret"));
        assert_eq!(ci.ref_name.as_deref(), Some("main"));
        assert_eq!(ci.event_name.as_deref(), Some("push"));
        assert_eq!(ci.sha.as_deref(), Some("abc123"));
        assert_eq!(ci.owner_repo(), Some(("acme".into(), "monorepo".into())));
    }

    #[test]
    fn falls_back_to_gh_token() {
        let ci = env(&[("GH_TOKEN", "gho_other")]);
        assert_eq!(ci.token(), Some("gho_other"));
    }

    #[test]
    fn empty_values_are_unset() {
        let ci = env(&[("GITHUB_TOKEN", "  "), ("GITHUB_REPOSITORY", "")]);
        assert!(!ci.has_token());
        assert!(ci.owner_repo().is_none());
    }

    #[test]
    fn debug_and_json_hide_token() {
        let ci = env(&[("GITHUB_TOKEN", "ghs_secret")]);
        assert!(!format!("{ci:?}").contains("ghs_secret"));
        assert!(!serde_json::to_string(&ci).unwrap().contains("ghs_secret"));
    }

    #[test]
    fn malformed_repository_slug() {
        assert!(env(&[("GITHUB_REPOSITORY", "acme")]).owner_repo().is_none());
        assert!(env(&[("GITHUB_REPOSITORY", "a/b/c")]).owner_repo().is_none());
    }
}
