//! Core library for tagrel.
//!
//! Turns `package@version` tags on a commit into GitHub releases whose
//! bodies come from each package's changelog.
//!
//! # Modules
//!
//! - [`changelog`] - Release notes extraction
//! - [`ci`] - CI environment capture
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//! - [`git`] - Git operations (tags, HEAD, remotes)
//! - [`github`] - GitHub release creation
//! - [`listing`] - Tag listing and output formats
//! - [`release`] - Publish planning and execution
//! - [`tag`] - Tag parsing and package matching
//! - [`workspace`] - Monorepo workspace scanning
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use tagrel_core::{CiEnvironment, ConfigLoader, PublishMode, release};
//!
//! let root = Utf8Path::new(".");
//! let config = ConfigLoader::new().with_project_search(root).load()?;
//! let ci = CiEnvironment::from_env();
//!
//! let plan = release::plan_publish(root, &config, &ci, None)?;
//! let summary = plan.execute(PublishMode::DryRun, |_| {});
//! println!("{} release(s) would be created", summary.published());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(unsafe_code)]

pub mod changelog;

pub mod ci;

pub mod config;

pub mod error;

pub mod git;

pub mod github;

pub mod listing;

pub mod release;

pub mod tag;

pub mod workspace;

pub use ci::CiEnvironment;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use github::{GitHubReleases, NewRelease, ReleaseHost};

pub use listing::{TagFormat, TagListing, TagQuery, TagSort};

pub use release::{PublishMode, PublishPlan, PublishSummary, TagOutcome};

pub use tag::TagRef;

pub use workspace::WorkspacePackage;

// Re-export regex so downstream crates can build tag filters without a direct dependency.
pub use regex;
