//! Doctor command: diagnose configuration and environment.

use camino::Utf8Path;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use tagrel_core::ci::CiEnvironment;
use tagrel_core::config::{self, Config};
use tagrel_core::{git, release, workspace};

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    git: GitStatus,
    github: GitHubStatus,
    workspace: WorkspaceStatus,
    config: ConfigStatus,
    directories: DirectoryPaths,
}

#[derive(Serialize)]
struct GitStatus {
    /// Path to the `git` executable, if found on PATH
    executable: Option<String>,
    /// Whether the working directory is inside a repository
    repository: bool,
}

#[derive(Serialize)]
struct GitHubStatus {
    /// Whether an API token is set (the value is never reported)
    token: bool,
    /// Resolved `owner/repo`
    repository: Option<String>,
    ref_name: Option<String>,
    event_name: Option<String>,
}

#[derive(Serialize)]
struct WorkspaceStatus {
    /// Whether the root manifest exists
    manifest: bool,
    /// Number of packages found, when the scan succeeded
    packages: Option<usize>,
    /// Scan error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to loaded config file, if any
    file: Option<String>,
    /// Whether a config file was found
    found: bool,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    data_local: Option<String>,
}

impl DoctorReport {
    fn gather(
        cwd: &Utf8Path,
        config: &Config,
        ci: &CiEnvironment,
        explicit_config: Option<&Utf8Path>,
    ) -> Self {
        // An explicit `--config` file wins over the discovered one, as in loading.
        let config_file = explicit_config
            .map(Utf8Path::to_path_buf)
            .or_else(|| config::find_project_config(cwd));
        let in_repo = git::is_inside_repo(cwd).unwrap_or(false);

        let repository = if in_repo {
            release::resolve_repository(config, ci, cwd)
                .ok()
                .map(|(owner, repo)| format!("{owner}/{repo}"))
        } else {
            ci.repository.clone()
        };

        let manifest = cwd.join(workspace::MANIFEST_FILE).is_file();
        let (packages, error) = if manifest {
            match workspace::discover_packages(cwd) {
                Ok(found) => (Some(found.len()), None),
                Err(e) => (None, Some(e.to_string())),
            }
        } else {
            (None, None)
        };

        Self {
            git: GitStatus {
                executable: git::executable().map(|p| p.to_string()),
                repository: in_repo,
            },
            github: GitHubStatus {
                token: ci.has_token(),
                repository,
                ref_name: ci.ref_name.clone(),
                event_name: ci.event_name.clone(),
            },
            workspace: WorkspaceStatus {
                manifest,
                packages,
                error,
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
        }
    }
}

/// Run diagnostics and report configuration status.
#[instrument(name = "cmd_doctor", skip_all)]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &Config,
    ci: &CiEnvironment,
    cwd: &Utf8Path,
    explicit_config: Option<&Utf8Path>,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = if global_json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(cwd, config, ci, explicit_config);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Git".bold().underline());
    match report.git.executable {
        Some(ref path) => check(true, &format!("git: {}", path.cyan())),
        None => check(false, "git not found on PATH"),
    }
    check(
        report.git.repository,
        if report.git.repository {
            "Inside a git repository"
        } else {
            "Not inside a git repository"
        },
    );
    println!();

    println!("{}", "GitHub".bold().underline());
    check(
        report.github.token,
        if report.github.token {
            "Token set"
        } else {
            "No GITHUB_TOKEN or GH_TOKEN (only --dry-run will work)"
        },
    );
    match report.github.repository {
        Some(ref slug) => check(true, &format!("Repository: {}", slug.cyan())),
        None => check(false, "Repository could not be determined"),
    }
    if let Some(ref name) = report.github.ref_name {
        println!("  {}: {}", "Ref".dimmed(), name);
    }
    if let Some(ref event) = report.github.event_name {
        println!("  {}: {}", "Event".dimmed(), event);
    }
    println!();

    println!("{}", "Workspace".bold().underline());
    if !report.workspace.manifest {
        check(false, &format!("No {} in {}", workspace::MANIFEST_FILE, cwd));
    } else if let Some(ref error) = report.workspace.error {
        check(false, error);
    } else {
        let count = report.workspace.packages.unwrap_or(0);
        check(true, &format!("{count} workspace package(s)"));
    }
    println!();

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        println!(
            "  {} Config file: {}",
            "✓".green(),
            report.config.file.as_deref().unwrap_or("").cyan()
        );
    } else {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    print_dir("  User config", report.directories.config.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());

    Ok(())
}

fn check(ok: bool, message: &str) {
    if ok {
        println!("  {} {message}", "✓".green());
    } else {
        println!("  {} {message}", "✗".red());
    }
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };

    let config_path = config_dir.join("config.yaml");
    if config_path.exists() || !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    // Declined or interrupted: nothing to do.
    if let Ok(true) = create {
        std::fs::create_dir_all(&config_dir)?;
        let yaml = serde_saphyr::to_string(&Config::default())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}
