//! `keelson validate` command

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::ValidateArgs;
use keelson::core::DEFAULT_DOCUMENT_NAME;
use keelson::ops::validate_all;
use keelson::util::diagnostic::emit;
use keelson::util::Settings;
use keelson::{component, platform};

pub fn execute(args: ValidateArgs, settings: &Settings, color: bool) -> Result<()> {
    let files = if args.files.is_empty() {
        vec![PathBuf::from(DEFAULT_DOCUMENT_NAME)]
    } else {
        args.files
    };
    let deny_warnings = args.deny_warnings || settings.deny_warnings();

    let reports = validate_all(
        &platform::builtin_registry(),
        &component::builtin_registry(),
        &files,
        &args.vars.overrides(),
    );

    let mut failed = 0;
    for report in &reports {
        emit(&report.diagnostics, color);

        if !report.passed(deny_warnings) {
            failed += 1;
            println!("{}: invalid", report.path.display());
            continue;
        }

        match (&report.platform, &report.meta) {
            (Some(platform), Some(meta)) => println!(
                "{}: ok ({}, {} node(s), assets in {})",
                report.path.display(),
                platform,
                meta.expected_nodes,
                meta.asset_dir
            ),
            _ => println!("{}: ok", report.path.display()),
        }
    }

    if failed > 0 {
        bail!(
            "{} of {} document(s) failed validation",
            failed,
            reports.len()
        );
    }

    Ok(())
}
