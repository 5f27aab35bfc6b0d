//! Publish command: thin CLI layer over `tagrel_core::release`.

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use tagrel_core::ci::CiEnvironment;
use tagrel_core::config::Config;
use tagrel_core::release::{self, PublishEvent, PublishMode, PublishSummary, TagOutcome, TagResult};

/// Arguments for the `publish` subcommand.
#[derive(Args, Debug, Default)]
pub struct PublishArgs {
    /// Commit whose tags are published (default: GITHUB_SHA, then HEAD)
    #[arg(long, value_name = "SHA")]
    pub commit: Option<String>,

    /// Show what would be published without calling the API
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the publish command.
///
/// Setup failures (no token, no repository, git or manifest errors) are
/// returned as errors. Per-tag failures are reported but never fail the
/// command.
#[instrument(name = "cmd_publish", skip_all)]
pub fn cmd_publish(
    args: PublishArgs,
    global_json: bool,
    config: &Config,
    ci: &CiEnvironment,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let dry_run = args.dry_run
        || config
            .release
            .as_ref()
            .and_then(|r| r.dry_run)
            .unwrap_or(false);

    debug!(json_output = global_json, dry_run, "executing publish command");

    // Credentials are checked before touching the repository.
    let client = if dry_run {
        None
    } else {
        Some(release::connect(config, ci, cwd).context("cannot publish releases")?)
    };

    let plan = release::plan_publish(cwd, config, ci, args.commit.as_deref())
        .context("failed to prepare release publication")?;

    let mode = match client {
        Some(ref client) => PublishMode::Live(client),
        None => PublishMode::DryRun,
    };

    if !global_json && dry_run {
        println!("{}", "DRY RUN: no releases will be created".yellow().bold());
    }

    let progress = if global_json || plan.tags.is_empty() {
        ProgressBar::hidden()
    } else {
        progress_bar(plan.tags.len())
    };

    let summary = plan.execute(mode, |event| match event {
        PublishEvent::TagStarted(tag) => progress.set_message(tag.to_string()),
        PublishEvent::TagFinished(result) => {
            if !global_json {
                // Printed even when the bar is hidden (stderr not a terminal).
                progress.suspend(|| println!("{}", format_result(result)));
            }
            progress.inc(1);
        }
    });
    progress.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("  {spinner:.cyan} [{pos}/{len}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

fn format_result(result: &TagResult) -> String {
    match &result.outcome {
        TagOutcome::Published { url } => {
            format!("  {} {} {}", "✓".green(), result.tag.bold(), url.cyan())
        }
        TagOutcome::WouldPublish => {
            let prerelease = result
                .release
                .as_ref()
                .is_some_and(|r| r.prerelease)
                .then_some(" (prerelease)")
                .unwrap_or_default();
            format!(
                "  {} {} {}",
                "○".green(),
                result.tag.bold(),
                format!("would publish{prerelease}").dimmed()
            )
        }
        TagOutcome::AlreadyExists => format!(
            "  {} {} {}",
            "!".yellow(),
            result.tag.bold(),
            "release already exists".yellow()
        ),
        TagOutcome::Skipped { reason } => format!(
            "  {} {} {}",
            "–".dimmed(),
            result.tag,
            format!("skipped: {reason}").dimmed()
        ),
        TagOutcome::Failed { error } => {
            format!("  {} {} {}", "✗".red(), result.tag.bold(), error.red())
        }
    }
}

fn print_summary(summary: &PublishSummary) {
    if summary.results.is_empty() {
        println!(
            "{} No tags point at {}",
            "○".dimmed(),
            short_sha(&summary.commit).cyan()
        );
        return;
    }

    let verb = if summary.dry_run {
        "would publish"
    } else {
        "published"
    };
    println!(
        "\n{} {}: {} {verb}, {} already existed, {} skipped, {} failed",
        if summary.failed() == 0 {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        },
        short_sha(&summary.commit).cyan(),
        summary.published(),
        summary.already_existing(),
        summary.skipped(),
        summary.failed(),
    );
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagrel_core::NewRelease;
    use tagrel_core::release::SkipReason;

    fn result(outcome: TagOutcome) -> TagResult {
        TagResult {
            tag: "web-app@1.2.0".into(),
            release: Some(NewRelease {
                tag_name: "web-app@1.2.0".into(),
                name: "web-app 1.2.0".into(),
                body: "Fixed login bug".into(),
                draft: false,
                prerelease: false,
            }),
            outcome,
        }
    }

    #[test]
    fn short_sha_truncates() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }

    #[test]
    fn result_lines_mention_tag() {
        owo_colors::set_override(false);
        let published = format_result(&result(TagOutcome::Published {
            url: "https://github.com/acme/mono/releases/tag/web-app%401.2.0".into(),
        }));
        assert!(published.contains("web-app@1.2.0"));
        assert!(published.contains("https://github.com/acme/mono"));

        let skipped = format_result(&result(TagOutcome::Skipped {
            reason: SkipReason::NoMatchingPackage,
        }));
        assert!(skipped.contains("skipped: no workspace package matches"));

        let failed = format_result(&result(TagOutcome::Failed {
            error: "GitHub API returned 403: Forbidden".into(),
        }));
        assert!(failed.contains("403"));
    }
}
