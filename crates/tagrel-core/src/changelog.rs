//! Release notes from a package changelog.
//!
//! A changelog is split into sections by level-two headings, `## 1.2.0` or
//! `## [1.2.0]` (trailing text such as a date is allowed). The notes for a
//! version are the lines between its heading and the next level-two
//! heading, trimmed.

use camino::Utf8Path;
use regex::Regex;
use tracing::{debug, warn};

/// Any level-two heading; ends a section.
const SECTION_HEADING: &str = r"^##\s";

/// Notes used when no changelog section is available.
pub fn fallback_notes(version: &str) -> String {
    format!("Release {version}")
}

/// Extract the notes for `version` from a changelog document.
///
/// Falls back to [`fallback_notes`] when there is no document, no heading
/// for the version, or the section is blank.
pub fn extract(document: Option<&str>, version: &str) -> String {
    let Some(document) = document else {
        debug!(%version, "no changelog document");
        return fallback_notes(version);
    };

    match section(document, version) {
        Some(notes) if !notes.is_empty() => notes,
        Some(_) => {
            debug!(%version, "changelog section is empty");
            fallback_notes(version)
        }
        None => {
            debug!(%version, "no changelog heading for version");
            fallback_notes(version)
        }
    }
}

/// Read `<package_dir>/<file_name>` and extract the notes for `version`.
///
/// An unreadable changelog is treated like a missing one.
pub fn notes_for(package_dir: &Utf8Path, file_name: &str, version: &str) -> String {
    let path = package_dir.join(file_name);
    let document = match std::fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(%path, error = %e, "failed to read changelog");
            None
        }
    };
    extract(document.as_deref(), version)
}

/// The trimmed section body, or `None` when no heading matches.
fn section(document: &str, version: &str) -> Option<String> {
    // Anything may follow a bracketed version (`## [1.2.0](link) (date)`);
    // a bare version must end at whitespace or end of line.
    let version = regex::escape(version);
    let opening = Regex::new(&format!(r"^##\s+(?:\[{version}\]|{version}(?:\s|$))")).ok()?;
    let closing = Regex::new(SECTION_HEADING).ok()?;

    let mut collected: Option<Vec<&str>> = None;
    for line in document.lines() {
        if let Some(lines) = collected.as_mut() {
            if closing.is_match(line) {
                break;
            }
            lines.push(line);
        } else if opening.is_match(line) {
            collected = Some(Vec::new());
        }
    }

    collected.map(|lines| lines.join("\n").trim().to_string())
}
