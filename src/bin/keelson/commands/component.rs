//! `keelson component` commands

use std::path::Path;

use anyhow::Result;

use crate::cli::ComponentRenderArgs;
use keelson::component;
use keelson::ops::component::{default_output_dir, render as render_component};
use keelson::ops::ComponentOptions;

pub fn render(args: ComponentRenderArgs) -> Result<()> {
    let output_dir = match args.output {
        Some(dir) => dir,
        None => {
            let base = args.document.config.parent().unwrap_or(Path::new("."));
            default_output_dir(base, &args.name)
        }
    };

    let opts = ComponentOptions {
        config: args.document.config,
        overrides: args.document.vars.overrides(),
        name: args.name,
        output_dir,
    };

    for artifact in render_component(&component::builtin_registry(), &opts)? {
        println!(
            "{} {}",
            if artifact.changed { "wrote" } else { "unchanged" },
            artifact.path.display()
        );
    }

    Ok(())
}
