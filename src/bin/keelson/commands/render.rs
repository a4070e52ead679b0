//! `keelson render` command

use anyhow::Result;

use crate::cli::DocumentArgs;
use keelson::ops::{cluster, ClusterOptions};
use keelson::platform;

pub fn execute(args: DocumentArgs) -> Result<()> {
    let opts = ClusterOptions {
        config: args.config,
        overrides: args.vars.overrides(),
    };

    let artifact = cluster::render(&platform::builtin_registry(), &opts)?;

    println!(
        "{} {} (sha256 {})",
        if artifact.changed { "wrote" } else { "unchanged" },
        artifact.path.display(),
        &artifact.digest[..12]
    );

    Ok(())
}
