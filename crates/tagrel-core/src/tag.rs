//! `name@version` tags and their workspace packages.

use std::fmt;

use serde::Serialize;

use crate::workspace::WorkspacePackage;

/// A tag split into package name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRef {
    /// Everything before the last `@`.
    pub name: String,
    /// Everything after the last `@`.
    pub version: String,
}

impl TagRef {
    /// Split a tag at its last `@`.
    ///
    /// Scoped names keep their leading `@` (`@acme/ui@1.0.0` has name
    /// `@acme/ui`). Returns `None` unless both halves are non-empty.
    pub fn parse(tag: &str) -> Option<Self> {
        let (name, version) = tag.rsplit_once('@')?;
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Find the first package whose name and version both equal the tag's.
///
/// Packages are searched in discovery order; duplicates resolve to the
/// first one found.
pub fn find_package<'a>(
    tag: &TagRef,
    packages: &'a [WorkspacePackage],
) -> Option<&'a WorkspacePackage> {
    packages
        .iter()
        .find(|pkg| pkg.name == tag.name && pkg.version == tag.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn pkg(name: &str, version: &str, dir: &str) -> WorkspacePackage {
        WorkspacePackage {
            name: name.into(),
            version: version.into(),
            directory: Utf8PathBuf::from(dir),
        }
    }

    #[test]
    fn parses_plain_tag() {
        let tag = TagRef::parse("web-app@1.2.0").unwrap();
        assert_eq!(tag.name, "web-app");
        assert_eq!(tag.version, "1.2.0");
        assert_eq!(tag.to_string(), "web-app@1.2.0");
    }

    #[test]
    fn parses_scoped_name() {
        let tag = TagRef::parse("@acme/ui@2.0.0-rc.1").unwrap();
        assert_eq!(tag.name, "@acme/ui");
        assert_eq!(tag.version, "2.0.0-rc.1");
    }

    #[test]
    fn rejects_tags_without_both_halves() {
        for tag in ["v1.2.0", "web-app@", "@1.2.0", "@", "", "release"] {
            assert!(TagRef::parse(tag).is_none(), "{tag} should not parse");
        }
    }

    #[test]
    fn find_requires_name_and_version() {
        let packages = vec![pkg("web-app", "1.1.0", "packages/web-app")];
        let tag = TagRef::parse("web-app@1.2.0").unwrap();
        assert!(find_package(&tag, &packages).is_none());

        let tag = TagRef::parse("api@1.1.0").unwrap();
        assert!(find_package(&tag, &packages).is_none());
    }

    #[test]
    fn find_returns_exact_match() {
        let packages = vec![
            pkg("api", "2.0.0", "packages/api"),
            pkg("web-app", "1.2.0", "packages/web-app"),
        ];
        let tag = TagRef::parse("web-app@1.2.0").unwrap();
        let found = find_package(&tag, &packages).unwrap();
        assert_eq!(found.directory, "packages/web-app");
    }

    #[test]
    fn find_prefers_first_duplicate() {
        let packages = vec![
            pkg("shared", "1.0.0", "apps/shared"),
            pkg("shared", "1.0.0", "packages/shared"),
        ];
        let tag = TagRef::parse("shared@1.0.0").unwrap();
        assert_eq!(
            find_package(&tag, &packages).unwrap().directory,
            "apps/shared"
        );
    }
}
