//! Tag-driven release publication.
//!
//! # Two-phase workflow
//!
//! 1. **Plan** ([`plan_publish`]): resolve the commit, collect its tags and
//!    scan the workspace. Any failure here is fatal.
//! 2. **Execute** ([`PublishPlan::execute`]): for each tag in listing
//!    order: parse, match a package, extract notes, create the release.
//!    Failures here are recorded per tag and never stop the loop.

use camino::Utf8Path;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::changelog;
use crate::ci::CiEnvironment;
use crate::config::Config;
use crate::git;
use crate::github::{
    DEFAULT_API_URL, GitHubReleases, GitHubRepo, NewRelease, PublishError, ReleaseHost,
};
use crate::tag::{self, TagRef};
use crate::workspace::{self, WorkspacePackage};

/// Version qualifiers that mark a prerelease.
const PRERELEASE_MARKERS: &[&str] = &["alpha", "beta", "rc", "pre"];

/// Fatal errors that stop a publish run before any tag is processed.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// No API token in the environment.
    #[error("no GitHub token found; set GITHUB_TOKEN or GH_TOKEN")]
    MissingToken,

    /// Owner/repo could not be determined.
    #[error(
        "could not determine the GitHub repository; set GITHUB_REPOSITORY, configure release.owner/release.repo, or add an origin remote"
    )]
    MissingRepository,

    /// Git error.
    #[error(transparent)]
    Git(#[from] git::GitError),

    /// Workspace error.
    #[error(transparent)]
    Workspace(#[from] workspace::WorkspaceError),

    /// The API client could not be built.
    #[error(transparent)]
    Client(#[from] PublishError),
}

/// Result alias for release operations.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Whether `version` carries a prerelease qualifier.
///
/// Looks at the part after the first `-`, up to any `+build` metadata, and
/// checks whether any `.`/`-` separated token starts with `alpha`, `beta`,
/// `rc` or `pre`, ignoring case.
pub fn is_prerelease(version: &str) -> bool {
    let Some((_, suffix)) = version.split_once('-') else {
        return false;
    };
    let suffix = suffix.split_once('+').map_or(suffix, |(pre, _)| pre);
    let suffix = suffix.to_ascii_lowercase();
    suffix
        .split(['.', '-'])
        .any(|token| PRERELEASE_MARKERS.iter().any(|m| token.starts_with(m)))
}

/// Build the release for a matched tag.
pub fn release_for(tag_name: &str, package: &WorkspacePackage, notes: String) -> NewRelease {
    NewRelease {
        tag_name: tag_name.to_string(),
        name: format!("{} {}", package.name, package.version),
        body: notes,
        draft: false,
        prerelease: is_prerelease(&package.version),
    }
}

/// Resolve owner and repo: config, then `GITHUB_REPOSITORY`, then the
/// `origin` remote.
pub fn resolve_repository(
    config: &Config,
    ci: &CiEnvironment,
    root: &Utf8Path,
) -> ReleaseResult<(String, String)> {
    let release = config.release.as_ref();
    if let Some((owner, repo)) = release.and_then(|r| r.owner.clone().zip(r.repo.clone())) {
        return Ok((owner, repo));
    }
    if let Some(pair) = ci.owner_repo() {
        return Ok(pair);
    }
    git::remote_url(root, "origin")?
        .as_deref()
        .and_then(git::parse_owner_repo)
        .ok_or(ReleaseError::MissingRepository)
}

/// Build an authenticated client for the repository being released.
#[instrument(skip_all)]
pub fn connect(
    config: &Config,
    ci: &CiEnvironment,
    root: &Utf8Path,
) -> ReleaseResult<GitHubReleases> {
    let token = ci.token().ok_or(ReleaseError::MissingToken)?;
    let (owner, repo) = resolve_repository(config, ci, root)?;
    let api_url = config
        .release
        .as_ref()
        .and_then(|r| r.api_url.clone())
        .or_else(|| ci.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    debug!(%owner, %repo, %api_url, "connecting to GitHub");
    Ok(GitHubReleases::new(GitHubRepo::new(api_url, owner, repo, token))?)
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// Everything needed to publish, gathered up front.
#[derive(Debug, Clone)]
pub struct PublishPlan {
    /// Commit whose tags are published.
    pub commit: String,
    /// Tags at the commit, in listing order.
    pub tags: Vec<String>,
    /// Workspace packages, in discovery order.
    pub packages: Vec<WorkspacePackage>,
    /// Changelog file name inside each package directory.
    pub changelog_file: String,
}

/// Collect the tags at the commit and scan the workspace.
///
/// The commit is `commit` if given, else `GITHUB_SHA`, else `HEAD`.
#[instrument(skip(config, ci))]
pub fn plan_publish(
    root: &Utf8Path,
    config: &Config,
    ci: &CiEnvironment,
    commit: Option<&str>,
) -> ReleaseResult<PublishPlan> {
    info!(
        ref_name = ci.ref_name.as_deref().unwrap_or("-"),
        event = ci.event_name.as_deref().unwrap_or("-"),
        "planning release publication"
    );

    let commit = match commit.or(ci.sha.as_deref()) {
        Some(commit) => commit.to_string(),
        None => git::head_commit(root)?,
    };
    let tags = git::tags_at(root, &commit, None)?;
    let packages = workspace::discover_packages(root)?;

    info!(
        %commit,
        tags = tags.len(),
        packages = packages.len(),
        "publish plan ready"
    );

    Ok(PublishPlan {
        commit,
        tags,
        packages,
        changelog_file: config.changelog_file().to_string(),
    })
}

// ──────────────────────────────────────────────
// Execute
// ──────────────────────────────────────────────

/// Where releases go.
#[derive(Clone, Copy)]
pub enum PublishMode<'a> {
    /// Create releases through the host.
    Live(&'a dyn ReleaseHost),
    /// Report what would be created; no remote calls.
    DryRun,
}

/// Why a tag was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The tag is not `name@version`.
    NotPackageTag,
    /// No workspace package has that name and version.
    NoMatchingPackage,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPackageTag => write!(f, "not a name@version tag"),
            Self::NoMatchingPackage => write!(f, "no workspace package matches"),
        }
    }
}

/// What happened to one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TagOutcome {
    /// The release was created.
    Published {
        /// URL of the new release.
        url: String,
    },
    /// Dry run: the release would have been created.
    WouldPublish,
    /// A release for the tag already existed.
    AlreadyExists,
    /// The tag was not eligible.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// Release creation failed.
    Failed {
        /// Error message.
        error: String,
    },
}

/// Result for a single tag.
#[derive(Debug, Clone, Serialize)]
pub struct TagResult {
    /// The tag as listed by git.
    pub tag: String,
    /// The release that was (or would be) created, when the tag matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<NewRelease>,
    /// The outcome.
    pub outcome: TagOutcome,
}

/// Events emitted while publishing, for progress display.
#[derive(Debug, Clone)]
pub enum PublishEvent<'a> {
    /// Processing of a tag started.
    TagStarted(&'a str),
    /// Processing of a tag finished.
    TagFinished(&'a TagResult),
}

/// Outcome of a publish run.
#[derive(Debug, Clone, Serialize)]
pub struct PublishSummary {
    /// Commit whose tags were processed.
    pub commit: String,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// One entry per tag, in listing order.
    pub results: Vec<TagResult>,
}

impl PublishSummary {
    fn count(&self, pred: impl Fn(&TagOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Releases created (or that would be created in a dry run).
    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::Published { .. } | TagOutcome::WouldPublish))
    }

    /// Tags whose release already existed.
    pub fn already_existing(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::AlreadyExists))
    }

    /// Tags skipped.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::Skipped { .. }))
    }

    /// Tags whose release failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::Failed { .. }))
    }
}

impl PublishPlan {
    /// Process every tag in order.
    #[instrument(skip_all, fields(commit = %self.commit, tags = self.tags.len()))]
    pub fn execute(
        &self,
        mode: PublishMode<'_>,
        mut on_event: impl FnMut(PublishEvent<'_>),
    ) -> PublishSummary {
        let mut results = Vec::with_capacity(self.tags.len());

        for tag in &self.tags {
            on_event(PublishEvent::TagStarted(tag));
            let result = self.process_tag(tag, mode);
            on_event(PublishEvent::TagFinished(&result));
            results.push(result);
        }

        let summary = PublishSummary {
            commit: self.commit.clone(),
            dry_run: matches!(mode, PublishMode::DryRun),
            results,
        };
        info!(
            published = summary.published(),
            already_existing = summary.already_existing(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "publish run finished"
        );
        summary
    }

    fn process_tag(&self, tag: &str, mode: PublishMode<'_>) -> TagResult {
        let skipped = |reason| TagResult {
            tag: tag.to_string(),
            release: None,
            outcome: TagOutcome::Skipped { reason },
        };

        let Some(tag_ref) = TagRef::parse(tag) else {
            info!(%tag, "skipping tag: not a name@version tag");
            return skipped(SkipReason::NotPackageTag);
        };

        let Some(package) = tag::find_package(&tag_ref, &self.packages) else {
            info!(
                %tag,
                name = %tag_ref.name,
                version = %tag_ref.version,
                "skipping tag: no workspace package matches"
            );
            return skipped(SkipReason::NoMatchingPackage);
        };

        let notes =
            changelog::notes_for(&package.directory, &self.changelog_file, &package.version);
        let release = release_for(tag, package, notes);
        debug!(%tag, name = %release.name, prerelease = release.prerelease, "release prepared");

        let outcome = match mode {
            PublishMode::DryRun => {
                info!(%tag, name = %release.name, "dry run: would create release");
                TagOutcome::WouldPublish
            }
            PublishMode::Live(host) => match host.create_release(&release) {
                Ok(url) => {
                    info!(%tag, %url, "release created");
                    TagOutcome::Published { url }
                }
                Err(PublishError::AlreadyExists { .. }) => {
                    warn!(%tag, "release already exists");
                    TagOutcome::AlreadyExists
                }
                Err(e) => {
                    error!(%tag, error = %e, "failed to create release");
                    TagOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            },
        };

        TagResult {
            tag: tag.to_string(),
            release: Some(release),
            outcome,
        }
    }
}
