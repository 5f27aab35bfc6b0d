//! Workspace discovery for `package.json` monorepos.
//!
//! The root `package.json` lists glob patterns under `workspaces`, either as
//! a plain array (npm) or as `{ "packages": [...] }` (yarn). Each pattern is
//! matched against directories below the root; a directory containing a
//! `package.json` becomes a workspace package. Patterns starting with `!`
//! exclude directories.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// File name of root and package manifests.
pub const MANIFEST_FILE: &str = "package.json";

/// Directories never descended into while matching patterns.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

/// Errors from workspace discovery.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// A manifest could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the manifest.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A manifest is not valid JSON or lacks required fields.
    #[error("malformed manifest {path}: {source}")]
    Malformed {
        /// Path of the manifest.
        path: Utf8PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// A `workspaces` entry is not a valid glob.
    #[error("invalid workspace pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        source: globset::Error,
    },

    /// Walking the directory tree failed.
    #[error("failed to scan {path}: {source}")]
    Walk {
        /// Directory being scanned.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Result alias for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// A package discovered in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspacePackage {
    /// Declared package name.
    pub name: String,
    /// Declared package version.
    pub version: String,
    /// Directory containing the package manifest.
    pub directory: Utf8PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct RootManifest {
    #[serde(default)]
    workspaces: Option<Workspaces>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Workspaces {
    Patterns(Vec<String>),
    Yarn {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Workspaces {
    fn into_patterns(self) -> Vec<String> {
        match self {
            Self::Patterns(patterns) | Self::Yarn { packages: patterns } => patterns,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: String,
    version: String,
}

/// Read the `workspaces` patterns from the root manifest.
///
/// A manifest without `workspaces` yields an empty list. A missing or
/// malformed manifest is an error.
#[instrument]
pub fn workspace_patterns(root: &Utf8Path) -> WorkspaceResult<Vec<String>> {
    let manifest: RootManifest = read_json(&root.join(MANIFEST_FILE))?;
    let patterns = manifest
        .workspaces
        .map(Workspaces::into_patterns)
        .unwrap_or_default();
    debug!(?patterns, "workspace patterns");
    Ok(patterns)
}

/// Resolve the root manifest's workspace patterns to package manifest paths.
///
/// Paths are returned in discovery order: patterns in declaration order,
/// directories in lexical order within a pattern. A manifest matched by more
/// than one pattern is returned once.
#[instrument]
pub fn scan(root: &Utf8Path) -> WorkspaceResult<Vec<Utf8PathBuf>> {
    let patterns = workspace_patterns(root)?;
    let (excludes, includes): (Vec<_>, Vec<_>) =
        patterns.iter().partition(|p| p.starts_with('!'));

    let exclude_matchers = excludes
        .iter()
        .map(|p| compile(p.trim_start_matches('!')))
        .collect::<WorkspaceResult<Vec<_>>>()?;

    let mut seen = HashSet::new();
    let mut manifests = Vec::new();

    for pattern in includes {
        let matcher = compile(pattern)?;
        let mut dirs = Vec::new();
        collect_matching_dirs(root, root, &matcher, &exclude_matchers, &mut dirs)?;

        for dir in dirs {
            let manifest = dir.join(MANIFEST_FILE);
            if manifest.is_file() && seen.insert(manifest.clone()) {
                manifests.push(manifest);
            }
        }
    }

    debug!(count = manifests.len(), "workspace manifests");
    Ok(manifests)
}

/// Read a package manifest. Both `name` and `version` are required.
pub fn read_package(manifest: &Utf8Path) -> WorkspaceResult<WorkspacePackage> {
    let PackageManifest { name, version } = read_json(manifest)?;
    let directory = manifest
        .parent()
        .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf);
    Ok(WorkspacePackage {
        name,
        version,
        directory,
    })
}

/// Scan the workspace and read every package manifest.
#[instrument]
pub fn discover_packages(root: &Utf8Path) -> WorkspaceResult<Vec<WorkspacePackage>> {
    scan(root)?
        .iter()
        .map(|manifest| read_package(manifest))
        .collect()
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Utf8Path) -> WorkspaceResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| WorkspaceError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn compile(pattern: &str) -> WorkspaceResult<GlobMatcher> {
    let normalized = pattern.trim_start_matches("./").trim_end_matches('/');
    GlobBuilder::new(normalized)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| WorkspaceError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn collect_matching_dirs(
    base: &Utf8Path,
    current: &Utf8Path,
    glob: &GlobMatcher,
    excludes: &[GlobMatcher],
    results: &mut Vec<Utf8PathBuf>,
) -> WorkspaceResult<()> {
    let walk_err = |source| WorkspaceError::Walk {
        path: current.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in current.read_dir_utf8().map_err(walk_err)? {
        let entry = entry.map_err(walk_err)?;
        if entry.file_type().map_err(walk_err)?.is_dir()
            && !SKIPPED_DIRS.contains(&entry.file_name())
        {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();

    for path in dirs {
        let relative = path.strip_prefix(base).unwrap_or(path.as_path());

        if excludes.iter().any(|ex| ex.is_match(relative)) {
            continue;
        }

        if glob.is_match(relative) {
            results.push(path.clone());
        }

        collect_matching_dirs(base, &path, glob, excludes, results)?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) fn write_package(root: &Utf8Path, dir: &str, name: &str, version: &str) {
        let pkg = root.join(dir);
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join(MANIFEST_FILE),
            format!(r#"{{"name": "{name}", "version": "{version}"}}"#),
        )
        .unwrap();
    }

    fn workspace(root_manifest: &str) -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::write(root.join(MANIFEST_FILE), root_manifest).unwrap();
        (tmp, root)
    }

    fn relative(root: &Utf8Path, paths: &[Utf8PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string())
            .collect()
    }

    #[test]
    fn missing_workspaces_field_is_empty() {
        let (_tmp, root) = workspace(r#"{"name": "root", "private": true}"#);
        assert!(workspace_patterns(&root).unwrap().is_empty());
        assert!(scan(&root).unwrap().is_empty());
    }

    #[test]
    fn yarn_style_workspaces_object() {
        let (_tmp, root) = workspace(r#"{"workspaces": {"packages": ["apps/*"]}}"#);
        assert_eq!(workspace_patterns(&root).unwrap(), vec!["apps/*"]);
    }

    #[test]
    fn missing_root_manifest_is_error() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        assert!(matches!(scan(&root), Err(WorkspaceError::Read { .. })));
    }

    #[test]
    fn malformed_root_manifest_is_error() {
        let (_tmp, root) = workspace("{ not json");
        assert!(matches!(scan(&root), Err(WorkspaceError::Malformed { .. })));
    }

    #[test]
    fn scan_matches_star_pattern_in_lexical_order() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["packages/*"]}"#);
        write_package(&root, "packages/web-app", "web-app", "1.2.0");
        write_package(&root, "packages/api", "api", "2.0.0");
        fs::create_dir_all(root.join("packages/empty")).unwrap();

        let found = scan(&root).unwrap();
        assert_eq!(
            relative(&root, &found),
            vec!["packages/api/package.json", "packages/web-app/package.json"]
        );
    }

    #[test]
    fn star_does_not_cross_directories() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["packages/*"]}"#);
        write_package(&root, "packages/group/nested", "nested", "1.0.0");

        assert!(scan(&root).unwrap().is_empty());
    }

    #[test]
    fn overlapping_patterns_are_deduplicated() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["packages/*", "packages/web-app"]}"#);
        write_package(&root, "packages/web-app", "web-app", "1.2.0");

        assert_eq!(scan(&root).unwrap().len(), 1);
    }

    #[test]
    fn negated_pattern_excludes_directory() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["packages/*", "!packages/legacy"]}"#);
        write_package(&root, "packages/web-app", "web-app", "1.2.0");
        write_package(&root, "packages/legacy", "legacy", "0.1.0");

        let found = scan(&root).unwrap();
        assert_eq!(relative(&root, &found), vec!["packages/web-app/package.json"]);
    }

    #[test]
    fn node_modules_is_skipped() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["**"]}"#);
        write_package(&root, "packages/web-app", "web-app", "1.2.0");
        write_package(&root, "node_modules/left-pad", "left-pad", "1.0.0");

        let found = scan(&root).unwrap();
        assert_eq!(relative(&root, &found), vec!["packages/web-app/package.json"]);
    }

    #[test]
    fn discover_packages_reads_name_version_and_directory() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["./packages/*/"]}"#);
        write_package(&root, "packages/web-app", "web-app", "1.2.0");

        let packages = discover_packages(&root).unwrap();
        assert_eq!(
            packages,
            vec![WorkspacePackage {
                name: "web-app".into(),
                version: "1.2.0".into(),
                directory: root.join("packages/web-app"),
            }]
        );
    }

    #[test]
    fn package_without_version_is_malformed() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["packages/*"]}"#);
        fs::create_dir_all(root.join("packages/tool")).unwrap();
        fs::write(root.join("packages/tool/package.json"), r#"{"name": "tool"}"#).unwrap();

        assert!(matches!(
            discover_packages(&root),
            Err(WorkspaceError::Malformed { .. })
        ));
    }

    #[test]
    fn invalid_pattern_is_error() {
        let (_tmp, root) = workspace(r#"{"workspaces": ["packages/[a"]}"#);
        assert!(matches!(scan(&root), Err(WorkspaceError::Pattern { .. })));
    }
}
