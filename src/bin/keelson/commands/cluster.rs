//! `keelson cluster` commands

use anyhow::Result;

use crate::cli::DocumentArgs;
use keelson::ops::{cluster, ClusterOptions};
use keelson::platform;
use keelson::terraform::TerraformExecutor;
use keelson::util::Settings;

fn options(args: DocumentArgs) -> ClusterOptions {
    ClusterOptions {
        config: args.config,
        overrides: args.vars.overrides(),
    }
}

pub fn apply(args: DocumentArgs, settings: &Settings) -> Result<()> {
    let mut executor = TerraformExecutor::from_settings(settings);
    let meta = cluster::apply(&platform::builtin_registry(), &options(args), &mut executor)?;

    println!(
        "Cluster applied, waiting for {} node(s) to join",
        meta.expected_nodes
    );
    Ok(())
}

pub fn destroy(args: DocumentArgs, settings: &Settings) -> Result<()> {
    let mut executor = TerraformExecutor::from_settings(settings);
    cluster::destroy(&platform::builtin_registry(), &options(args), &mut executor)?;

    println!("Cluster destroyed");
    Ok(())
}
