//! Running the external provisioning tool.
//!
//! Provisioning runs for minutes and its progress is the operator's only
//! feedback, so child output is inherited rather than captured.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

/// One invocation of an external program.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// Add an environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Directory the program runs in.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Run to completion with inherited stdout/stderr. A non-zero exit is
    /// an error naming the command and, when set, the directory.
    pub fn run(&self) -> Result<()> {
        let shown = self.display_command();
        tracing::debug!("running `{}`", shown);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", shown))?;

        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("exit code {}", c));
            match &self.cwd {
                Some(cwd) => bail!("`{}` in {} failed with {}", shown, cwd.display(), code),
                None => bail!("`{}` failed with {}", shown, code),
            }
        }
        Ok(())
    }

    /// The command line as the operator would type it.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Locate `name` on PATH. Names with a path separator are checked as given.
pub fn find_executable(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    which::which(name).ok()
}
