//! rtpack - bundle a runtime into per-platform release artifacts

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use rtpack_cli::cmd::build::Selection;
use rtpack_cli::ui::console::ICON_ERROR;
use rtpack_cli::{Cli, Commands, cmd, exit};
use rtpack_core::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let code = match run(cli, cancel).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {}", ICON_ERROR.red(), format!("{err:#}").red());
            exit::code_for(&err)
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<i32> {
    if let Some(dir) = &cli.dir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot change to {}", dir.display()))?;
    }
    let working_dir = std::env::current_dir().context("cannot determine working directory")?;

    let config_path = cli.config;
    let load_config =
        || Config::load(config_path.as_deref()).context("failed to load configuration");

    match cli.command {
        Commands::Build {
            universal,
            all,
            targets,
            jobs,
        } => {
            let selection = if universal {
                Selection::Universal
            } else if all {
                Selection::Configured
            } else {
                Selection::Targets(targets)
            };
            cmd::build::build(load_config()?, &working_dir, &selection, jobs, cancel).await
        }
        Commands::Resolve { platform } => {
            cmd::resolve::resolve(&load_config()?, &platform).await?;
            Ok(0)
        }
        Commands::Hash { files } => {
            cmd::hash::hash(&files).await?;
            Ok(0)
        }
        Commands::Sign { files } => {
            cmd::sign::sign(&load_config()?, &working_dir, files).await?;
            Ok(0)
        }
        Commands::Verify {
            file,
            public_key,
            signature,
        } => {
            cmd::verify::verify(&file, &public_key, signature.as_deref()).await?;
            Ok(0)
        }
        Commands::Platforms => {
            cmd::platforms::platforms(&load_config()?);
            Ok(0)
        }
        Commands::Clean => {
            cmd::clean::clean(load_config()?, &working_dir).await?;
            Ok(0)
        }
    }
}
