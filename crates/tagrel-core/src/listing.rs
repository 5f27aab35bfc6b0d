//! Tag listing in several output shapes.
//!
//! Lists the tags at a commit (or every tag in the repository), optionally
//! filtered by a regex and truncated, then renders them as a plain list,
//! CSV, `KEY=value` lines for CI environment files, or JSON.

use std::fmt;

use camino::Utf8Path;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::git::{self, GitResult};

/// Output shape for a tag listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagFormat {
    /// One tag per line.
    #[default]
    List,
    /// Comma-separated values with a header row.
    Csv,
    /// `KEY=value` lines, suitable for `$GITHUB_OUTPUT` or `.env` files.
    Env,
    /// A JSON object.
    Json,
}

/// Sort order for listed tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagSort {
    /// Highest version first.
    #[default]
    Version,
    /// Newest tag first.
    Date,
    /// Lexicographic.
    Name,
}

impl TagSort {
    /// The equivalent `git tag --sort` key.
    pub const fn git_key(self) -> &'static str {
        match self {
            Self::Version => "-version:refname",
            Self::Date => "-creatordate",
            Self::Name => "refname",
        }
    }
}

impl fmt::Display for TagSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => write!(f, "version"),
            Self::Date => write!(f, "date"),
            Self::Name => write!(f, "name"),
        }
    }
}

/// What to list.
#[derive(Debug, Clone, Default)]
pub struct TagQuery {
    /// Commit to inspect; `HEAD` when unset. Ignored with `all`.
    pub commit: Option<String>,
    /// List every tag in the repository instead of those at one commit.
    pub all: bool,
    /// Sort order.
    pub sort: TagSort,
    /// Keep only tags matching this pattern.
    pub filter: Option<Regex>,
    /// Keep at most this many tags (after filtering).
    pub limit: Option<usize>,
}

/// The listed tags and the commit they were read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagListing {
    /// Resolved commit hash; `None` when listing all tags.
    pub commit: Option<String>,
    /// Tags in output order.
    pub tags: Vec<String>,
}

/// Run a [`TagQuery`] against the repository at `repo`.
#[instrument(skip(query), fields(all = query.all, sort = %query.sort))]
pub fn collect(repo: &Utf8Path, query: &TagQuery) -> GitResult<TagListing> {
    let (commit, mut tags) = if query.all {
        (None, git::all_tags(repo, query.sort.git_key())?)
    } else {
        let commit = match &query.commit {
            Some(commit) => commit.clone(),
            None => git::head_commit(repo)?,
        };
        let tags = git::tags_at(repo, &commit, Some(query.sort.git_key()))?;
        (Some(commit), tags)
    };

    if let Some(ref filter) = query.filter {
        tags.retain(|tag| filter.is_match(tag));
    }
    if let Some(limit) = query.limit {
        tags.truncate(limit);
    }

    debug!(count = tags.len(), "tags listed");
    Ok(TagListing { commit, tags })
}

impl TagListing {
    /// Render in the given format. The commit is included only when
    /// `include_commit` is set and a commit is known.
    pub fn render(&self, format: TagFormat, include_commit: bool) -> String {
        let commit = self.commit.as_deref().filter(|_| include_commit);
        match format {
            TagFormat::List => self.render_list(),
            TagFormat::Csv => self.render_csv(commit),
            TagFormat::Env => self.render_env(commit),
            TagFormat::Json => self.render_json(commit),
        }
    }

    fn render_list(&self) -> String {
        self.tags.iter().map(|tag| format!("{tag}\n")).collect()
    }

    fn render_csv(&self, commit: Option<&str>) -> String {
        let mut out = String::from(if commit.is_some() { "tag,commit\n" } else { "tag\n" });
        for tag in &self.tags {
            out.push_str(&csv_field(tag));
            if let Some(commit) = commit {
                out.push(',');
                out.push_str(&csv_field(commit));
            }
            out.push('\n');
        }
        out
    }

    fn render_env(&self, commit: Option<&str>) -> String {
        let mut out = format!(
            "TAGS={}\nTAG_COUNT={}\nLATEST_TAG={}\n",
            self.tags.join(","),
            self.tags.len(),
            self.tags.first().map_or("", String::as_str),
        );
        if let Some(commit) = commit {
            out.push_str(&format!("COMMIT={commit}\n"));
        }
        out
    }

    fn render_json(&self, commit: Option<&str>) -> String {
        let mut value = serde_json::json!({
            "tags": self.tags,
            "count": self.tags.len(),
        });
        if let Some(commit) = commit {
            value["commit"] = serde_json::Value::String(commit.to_string());
        }
        format!("{value}\n")
    }
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::tests::{init_repo, tag};

    fn listing(tags: &[&str]) -> TagListing {
        TagListing {
            commit: Some("abc123".into()),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[test]
    fn list_format_one_per_line() {
        assert_eq!(
            listing(&["a@1.0.0", "b@2.0.0"]).render(TagFormat::List, true),
            "a@1.0.0\nb@2.0.0\n"
        );
        assert_eq!(listing(&[]).render(TagFormat::List, false), "");
    }

    #[test]
    fn csv_format_with_and_without_commit() {
        let tags = listing(&["a@1.0.0", "odd,tag"]);
        assert_eq!(
            tags.render(TagFormat::Csv, false),
            "tag\na@1.0.0\n\"odd,tag\"\n"
        );
        assert_eq!(
            tags.render(TagFormat::Csv, true),
            "tag,commit\na@1.0.0,abc123\n\"odd,tag\",abc123\n"
        );
    }

    #[test]
    fn env_format() {
        assert_eq!(
            listing(&["a@1.0.0", "b@2.0.0"]).render(TagFormat::Env, true),
            "TAGS=a@1.0.0,b@2.0.0\nTAG_COUNT=2\nLATEST_TAG=a@1.0.0\nCOMMIT=abc123\n"
        );
        assert_eq!(
            listing(&[]).render(TagFormat::Env, false),
            "TAGS=\nTAG_COUNT=0\nLATEST_TAG=\n"
        );
    }

    #[test]
    fn json_format() {
        let out = listing(&["a@1.0.0"]).render(TagFormat::Json, true);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["tags"][0], "a@1.0.0");
        assert_eq!(value["count"], 1);
        assert_eq!(value["commit"], "abc123");

        let out = listing(&["a@1.0.0"]).render(TagFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value.get("commit").is_none());
    }

    #[test]
    fn sort_keys() {
        assert_eq!(TagSort::Version.git_key(), "-version:refname");
        assert_eq!(TagSort::Date.git_key(), "-creatordate");
        assert_eq!(TagSort::Name.git_key(), "refname");
    }

    #[test]
    fn collect_filters_and_limits() {
        let (_tmp, root) = init_repo();
        for name in ["web@1.0.0", "web@1.10.0", "web@1.2.0", "api@3.0.0"] {
            tag(&root, name);
        }

        let query = TagQuery {
            filter: Some(Regex::new("^web@").unwrap()),
            limit: Some(2),
            ..Default::default()
        };
        let listing = collect(&root, &query).unwrap();
        assert_eq!(listing.tags, vec!["web@1.10.0", "web@1.2.0"]);
        assert_eq!(listing.commit.as_deref().map(str::len), Some(40));
    }

    #[test]
    fn collect_all_has_no_commit() {
        let (_tmp, root) = init_repo();
        tag(&root, "b@1.0.0");
        tag(&root, "a@1.0.0");

        let query = TagQuery {
            all: true,
            sort: TagSort::Name,
            ..Default::default()
        };
        let listing = collect(&root, &query).unwrap();
        assert_eq!(listing.commit, None);
        assert_eq!(listing.tags, vec!["a@1.0.0", "b@1.0.0"]);
    }
}
