//! Tags command: list the tags on a commit in a scripting-friendly format.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, info, instrument};

use tagrel_core::config::Config;
use tagrel_core::listing::{self, TagFormat, TagQuery, TagSort};
use tagrel_core::regex::Regex;

/// Arguments for the `tags` subcommand.
#[derive(Args, Debug, Default)]
pub struct TagsArgs {
    /// Output format (default: list, or json with --json)
    #[arg(short, long, value_enum)]
    pub format: Option<TagFormat>,

    /// Only keep tags matching this regular expression
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Write output to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,

    /// Include the commit hash in the output
    #[arg(long)]
    pub include_commit: bool,

    /// Sort order
    #[arg(long, value_enum)]
    pub sort: Option<TagSort>,

    /// Keep at most N tags
    #[arg(short = 'n', long, value_name = "N")]
    pub limit: Option<usize>,

    /// Commit to inspect (default: HEAD)
    #[arg(long, value_name = "SHA", conflicts_with = "all")]
    pub commit: Option<String>,

    /// List every tag in the repository, not just those on one commit
    #[arg(long)]
    pub all: bool,
}

/// List tags.
#[instrument(name = "cmd_tags", skip_all)]
pub fn cmd_tags(
    args: TagsArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let defaults = config.tags.clone().unwrap_or_default();

    let format = args.format.unwrap_or(if global_json {
        TagFormat::Json
    } else {
        defaults.format.unwrap_or_default()
    });
    let include_commit = args.include_commit || defaults.include_commit.unwrap_or(false);

    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --filter pattern")?;

    let query = TagQuery {
        commit: args.commit,
        all: args.all,
        sort: args.sort.or(defaults.sort).unwrap_or_default(),
        filter,
        limit: args.limit,
    };
    debug!(?format, include_commit, ?query, "executing tags command");

    let tags = listing::collect(cwd, &query).context("failed to list tags")?;
    let rendered = tags.render(format, include_commit);

    match args.output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("failed to write {path}"))?;
            info!(%path, count = tags.tags.len(), "tags written");
            if !global_json {
                println!(
                    "{} Wrote {} tag(s) to {}",
                    "✓".green(),
                    tags.tags.len(),
                    path.cyan()
                );
            }
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
