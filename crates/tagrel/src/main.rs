//! tagrel CLI
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use tagrel::{Cli, Commands, commands};
use tagrel_core::ci::CiEnvironment;
use tagrel_core::config::ConfigLoader;
use tracing::debug;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = camino::Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;
    let explicit_config = cli
        .config
        .clone()
        .map(|path| {
            camino::Utf8PathBuf::try_from(path).map_err(|e| {
                anyhow::anyhow!(
                    "config path is not valid UTF-8: {}",
                    e.into_path_buf().display()
                )
            })
        })
        .transpose()?;
    let mut loader = ConfigLoader::new()
        .with_user_config(true)
        .with_project_search(&cwd);
    if let Some(ref config_path) = explicit_config {
        loader = loader.with_file(config_path);
    }
    let config = loader.load().context("failed to load configuration")?;

    let obs_config = observability::ObservabilityConfig::from_env_with_overrides(
        config
            .log_dir
            .as_ref()
            .map(|dir| dir.as_std_path().to_path_buf()),
        cli.color.stderr_ansi(),
    );
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter)
        .context("failed to initialize logging")?;

    // Read once; everything downstream takes it explicitly.
    let ci = CiEnvironment::from_env();

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        ci = ?ci,
        "CLI initialized"
    );

    let result = match cli.command {
        Commands::Publish(args) => {
            commands::publish::cmd_publish(args, cli.json, &config, &ci, &cwd)
        }
        Commands::Tags(args) => commands::tags::cmd_tags(args, cli.json, &config, &cwd),
        Commands::Doctor(args) => commands::doctor::cmd_doctor(
            args,
            cli.json,
            &config,
            &ci,
            &cwd,
            explicit_config.as_deref(),
        ),
        Commands::Info(args) => commands::info::cmd_info(args, cli.json, &config, &cwd),
    };
    if let Err(ref err) = result {
        tracing::error!(error = %format_args!("{err:#}"), "fatal error");
    }
    result
}
