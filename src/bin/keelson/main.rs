//! keelson CLI - Kubernetes cluster provisioning

use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use keelson::ops::LifecycleError;
use keelson::util::config::{global_config_path, load_settings, project_config_path};
use keelson::util::diagnostic::emit;

mod cli;
mod commands;

use cli::{Cli, ClusterCommands, Commands, ComponentCommands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        if let Some(LifecycleError::InvalidConfig { diagnostics }) =
            e.downcast_ref::<LifecycleError>()
        {
            emit(diagnostics, color);
        }
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("keelson=debug")
    } else {
        EnvFilter::new("keelson=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(color)
        .init();

    // Tool settings: global, then project, then flags
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let global = global_config_path();
    let mut settings = load_settings(global.as_deref(), &project_config_path(&cwd));
    if let Some(binary) = cli.terraform {
        settings.executor.binary = Some(binary);
    }

    // Execute command
    match cli.command {
        Commands::Validate(args) => commands::validate::execute(args, &settings, color),
        Commands::Render(args) => commands::render::execute(args),
        Commands::Cluster(args) => match args.command {
            ClusterCommands::Apply(args) => commands::cluster::apply(args, &settings),
            ClusterCommands::Destroy(args) => commands::cluster::destroy(args, &settings),
        },
        Commands::Component(args) => match args.command {
            ComponentCommands::Render(args) => commands::component::render(args),
        },
        Commands::Platforms => commands::platforms::execute(),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
