//! Read-only git queries.
//!
//! Shells out to `git` for all operations so the user's configuration
//! (safe directories, alternates, credential helpers) applies unchanged.
//! Nothing in this module writes to the repository.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "tag").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Locate the `git` executable on `PATH`.
pub fn executable() -> Option<Utf8PathBuf> {
    which::which("git")
        .ok()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

/// Resolve the full hash of `HEAD`.
#[instrument]
pub fn head_commit(repo: &Utf8Path) -> GitResult<String> {
    let commit = git(repo, &["rev-parse", "HEAD"])?.trim().to_string();
    debug!(%commit, "resolved HEAD");
    Ok(commit)
}

/// List the tags pointing exactly at `commit`.
///
/// Order is git's listing order, or the order given by `sort` (a git
/// `--sort` key such as `-version:refname`). Returns an empty list when the
/// commit has no tags; a failing query is an error.
#[instrument]
pub fn tags_at(repo: &Utf8Path, commit: &str, sort: Option<&str>) -> GitResult<Vec<String>> {
    let sort_arg = sort.map(|key| format!("--sort={key}"));
    let mut args = vec!["tag", "--points-at", commit];
    if let Some(ref sort_arg) = sort_arg {
        args.push(sort_arg);
    }

    let tags = lines(&git(repo, &args)?);
    debug!(count = tags.len(), "tags at commit");
    Ok(tags)
}

/// List every tag in the repository, sorted by the given git `--sort` key.
#[instrument]
pub fn all_tags(repo: &Utf8Path, sort: &str) -> GitResult<Vec<String>> {
    let sort_arg = format!("--sort={sort}");
    let tags = lines(&git(repo, &["tag", "--list", &sort_arg])?);
    debug!(count = tags.len(), "all tags");
    Ok(tags)
}

/// Get the remote URL for a named remote (usually `"origin"`).
///
/// Returns `None` when the remote is not configured.
#[instrument]
pub fn remote_url(repo: &Utf8Path, remote: &str) -> GitResult<Option<String>> {
    match git(repo, &["remote", "get-url", remote]) {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse owner and repo from a git remote URL.
///
/// Handles both HTTPS and SSH formats:
/// - `https://github.com/owner/repo.git`
/// - `git@github.com:owner/repo.git`
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let path = url.strip_prefix("git@").map_or_else(
        || {
            url.split("//")
                .nth(1)
                .and_then(|after_scheme| after_scheme.split_once('/').map(|(_, path)| path))
        },
        |rest| rest.split_once(':').map(|(_, path)| path),
    )?;

    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some((owner.to_string(), repo.to_string()))
}

/// Check if `repo` is inside a git work tree.
#[instrument]
pub fn is_inside_repo(repo: &Utf8Path) -> GitResult<bool> {
    match git(repo, &["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

fn lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Run a git command in `repo` and return its stdout.
fn git(repo: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo.as_std_path())
        .output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    /// Create a throwaway repository with one commit.
    pub(crate) fn init_repo() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        for args in [
            vec!["init", "--quiet"],
            vec!["config", "user.email", "ci@example.com"],
            vec!["config", "user.name", "CI"],
            vec!["config", "commit.gpgsign", "false"],
            vec!["config", "tag.gpgsign", "false"],
            vec!["commit", "--allow-empty", "--quiet", "-m", "initial"],
        ] {
            git(&root, &args).unwrap();
        }
        (tmp, root)
    }

    pub(crate) fn tag(root: &Utf8Path, name: &str) {
        git(root, &["tag", name]).unwrap();
    }

    fn commit(root: &Utf8Path, message: &str) {
        git(root, &["commit", "--allow-empty", "--quiet", "-m", message]).unwrap();
    }

    #[test]
    fn head_commit_is_full_hash() {
        let (_tmp, root) = init_repo();
        let head = head_commit(&root).unwrap();
        assert_eq!(head.len(), 40);
        assert!(head.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tags_at_returns_only_tags_on_commit() {
        let (_tmp, root) = init_repo();
        tag(&root, "old@1.0.0");
        commit(&root, "second");
        tag(&root, "web-app@1.2.0");
        tag(&root, "api@2.0.0");

        let head = head_commit(&root).unwrap();
        let tags = tags_at(&root, &head, None).unwrap();
        assert_eq!(tags, vec!["api@2.0.0", "web-app@1.2.0"]);
    }

    #[test]
    fn tags_at_untagged_commit_is_empty() {
        let (_tmp, root) = init_repo();
        let head = head_commit(&root).unwrap();
        assert!(tags_at(&root, &head, None).unwrap().is_empty());
    }

    #[test]
    fn tags_at_unknown_commit_fails() {
        let (_tmp, root) = init_repo();
        let result = tags_at(&root, "0000000000000000000000000000000000000000", None);
        assert!(matches!(result, Err(GitError::Command { .. })));
    }

    #[test]
    fn all_tags_version_sort() {
        let (_tmp, root) = init_repo();
        tag(&root, "v1.2.0");
        tag(&root, "v1.10.0");
        tag(&root, "v1.9.0");

        let tags = all_tags(&root, "-version:refname").unwrap();
        assert_eq!(tags, vec!["v1.10.0", "v1.9.0", "v1.2.0"]);
    }

    #[test]
    fn head_commit_outside_repo_fails() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        assert!(head_commit(&root).is_err());
        assert!(!is_inside_repo(&root).unwrap());
    }

    #[test]
    fn remote_url_missing_remote_is_none() {
        let (_tmp, root) = init_repo();
        assert_eq!(remote_url(&root, "origin").unwrap(), None);
    }

    #[test]
    fn parse_owner_repo_https() {
        let result = parse_owner_repo("https://github.com/acme/monorepo.git");
        assert_eq!(result, Some(("acme".into(), "monorepo".into())));
    }

    #[test]
    fn parse_owner_repo_ssh_no_suffix() {
        let result = parse_owner_repo("git@github.com:acme/monorepo");
        assert_eq!(result, Some(("acme".into(), "monorepo".into())));
    }

    #[test]
    fn parse_owner_repo_invalid() {
        assert!(parse_owner_repo("not-a-url").is_none());
        assert!(parse_owner_repo("").is_none());
        assert!(parse_owner_repo("https://github.com/acme/a/b").is_none());
    }
}
