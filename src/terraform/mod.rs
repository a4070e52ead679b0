//! External executor contract and the terraform implementation.
//!
//! The executor turns a rendered root directory into real infrastructure.
//! Its output is streamed to the operator and its failures are propagated
//! without interpretation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::config::Settings;
use crate::util::process::{find_executable, ProcessBuilder};

/// Directory under the asset directory that holds rendered artifacts.
pub const ROOT_DIR_NAME: &str = "terraform";

/// The terraform root directory for an (expanded) asset directory.
pub fn root_dir(asset_dir: &Path) -> PathBuf {
    asset_dir.join(ROOT_DIR_NAME)
}

/// Operations the provisioning core drives on an external executor.
pub trait Executor {
    /// Point the executor at the directory rendering populated.
    fn initialize(&mut self, root_dir: &Path) -> Result<()>;

    /// Create or update infrastructure to match the rendered artifacts.
    fn apply(&mut self) -> Result<()>;

    /// Tear down everything the rendered artifacts describe.
    fn destroy(&mut self) -> Result<()>;
}

/// Executor that shells out to the `terraform` binary.
#[derive(Debug, Clone)]
pub struct TerraformExecutor {
    binary: PathBuf,
    parallelism: Option<u32>,
    root_dir: Option<PathBuf>,
}

impl TerraformExecutor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        TerraformExecutor {
            binary: binary.into(),
            parallelism: None,
            root_dir: None,
        }
    }

    /// Build an executor from tool settings.
    pub fn from_settings(settings: &Settings) -> Self {
        TerraformExecutor {
            binary: settings.executor_binary(),
            parallelism: settings.executor.parallelism,
            root_dir: None,
        }
    }

    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }

    fn command(&self) -> Result<ProcessBuilder> {
        let Some(root_dir) = &self.root_dir else {
            bail!("terraform executor used before initialization");
        };

        Ok(ProcessBuilder::new(&self.binary)
            .cwd(root_dir)
            .env("TF_IN_AUTOMATION", "1"))
    }

    fn init(&self) -> Result<()> {
        self.command()?
            .args(["init", "-input=false"])
            .run()
            .context("terraform init failed")
    }

    fn run_changing(&self, subcommand: &str) -> Result<()> {
        let mut cmd = self
            .command()?
            .args([subcommand, "-auto-approve", "-input=false"]);
        if let Some(n) = self.parallelism {
            cmd = cmd.arg(format!("-parallelism={}", n));
        }

        cmd.run()
            .with_context(|| format!("terraform {} failed", subcommand))
    }
}

impl Executor for TerraformExecutor {
    fn initialize(&mut self, root_dir: &Path) -> Result<()> {
        if find_executable(&self.binary).is_none() {
            bail!(
                "terraform binary `{}` not found; install terraform or set `executor.binary` in .keelson/config.toml",
                self.binary.display()
            );
        }

        tracing::debug!(
            "terraform root directory: {} (binary {})",
            root_dir.display(),
            self.binary.display()
        );
        self.root_dir = Some(root_dir.to_path_buf());
        Ok(())
    }

    fn apply(&mut self) -> Result<()> {
        self.init()?;
        self.run_changing("apply")
    }

    fn destroy(&mut self) -> Result<()> {
        self.init()?;
        self.run_changing("destroy")
    }
}
