//! Platform backends.
//!
//! A platform backend turns one `cluster.<platform>` table into a validated
//! model, renders that model into `cluster.tf`, and drives an [`Executor`]
//! against the rendered directory. Every backend exposes the same contract
//! ([`PlatformBackend`]) and is looked up by name in a [`PlatformRegistry`].

pub mod aws;
pub mod baremetal;
pub mod tags;

use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use thiserror::Error;
use toml::Value;

use crate::core::eval::EvalContext;
use crate::core::registry::Registry;
use crate::render::{RenderError, RenderedArtifact};
use crate::terraform::{self, Executor};
use crate::util::diagnostic::Diagnostics;
use crate::util::fs::{expand_home, ExpandError};

/// Name of the artifact every backend renders.
pub const CLUSTER_FILE: &str = "cluster.tf";

/// Registry of platform backends.
pub type PlatformRegistry = Registry<dyn PlatformBackend>;

/// A registry holding every built-in backend.
pub fn builtin_registry() -> PlatformRegistry {
    let mut registry = PlatformRegistry::new("platform");
    aws::register(&mut registry);
    baremetal::register(&mut registry);
    registry
}

/// Summary of a validated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meta {
    /// Asset directory as configured, before home expansion
    pub asset_dir: String,

    /// Controllers plus workers the cluster should end up with
    pub expected_nodes: usize,
}

/// Failure while initializing, applying or destroying a platform.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum PlatformError {
    #[error("failed to expand asset directory `{path}`")]
    #[diagnostic(code(keelson::platform::asset_dir))]
    ExpandAssetDir {
        path: String,
        #[source]
        source: ExpandError,
    },

    #[error("failed to create directory {}", .path.display())]
    #[diagnostic(code(keelson::platform::create_dir))]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    #[error("{operation} failed")]
    #[diagnostic(code(keelson::platform::executor))]
    Executor {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// The uniform contract every platform backend implements.
pub trait PlatformBackend {
    /// Registry name, also the key of the `cluster.<name>` table.
    fn name(&self) -> &'static str;

    /// One-line description for listings.
    fn description(&self) -> &'static str;

    /// Decode `body` into the backend's model.
    ///
    /// An absent body yields no diagnostics and keeps the defaults.
    fn decode(&mut self, body: Option<&Value>, ctx: &EvalContext) -> Diagnostics;

    /// Check the decoded model. Never mutates it.
    fn validate(&self) -> Diagnostics;

    /// Summary of the decoded model.
    fn meta(&self) -> Meta;

    /// Render artifacts into `root_dir`, which already exists.
    fn render(&self, root_dir: &Path) -> Result<RenderedArtifact, RenderError>;

    /// Decode then validate. Validation only runs when decoding produced no
    /// errors.
    fn load_config(&mut self, body: Option<&Value>, ctx: &EvalContext) -> Diagnostics {
        if body.is_none() {
            return Diagnostics::new();
        }

        let mut diags = self.decode(body, ctx);
        if !diags.has_errors() {
            diags.extend(self.validate());
        }
        diags
    }

    /// Resolve the asset directory, render artifacts into its terraform
    /// root and point `executor` at it.
    fn initialize(&self, executor: &mut dyn Executor) -> Result<RenderedArtifact, PlatformError> {
        let root = prepare_root_dir(&self.meta().asset_dir)?;
        let artifact = self.render(&root)?;

        executor
            .initialize(&root)
            .map_err(|e| PlatformError::Executor {
                operation: "initialize",
                source: e.into(),
            })?;

        Ok(artifact)
    }

    /// Create or update the infrastructure.
    fn apply(&self, executor: &mut dyn Executor) -> Result<(), PlatformError> {
        executor.apply().map_err(|e| PlatformError::Executor {
            operation: "apply",
            source: e.into(),
        })
    }

    /// Tear the infrastructure down.
    fn destroy(&self, executor: &mut dyn Executor) -> Result<(), PlatformError> {
        executor.destroy().map_err(|e| PlatformError::Executor {
            operation: "destroy",
            source: e.into(),
        })
    }
}

/// Expand `asset_dir` and make sure its terraform root exists.
pub fn prepare_root_dir(asset_dir: &str) -> Result<PathBuf, PlatformError> {
    let expanded = expand_home(asset_dir).map_err(|source| PlatformError::ExpandAssetDir {
        path: asset_dir.to_string(),
        source,
    })?;

    let root = terraform::root_dir(&expanded);
    std::fs::create_dir_all(&root).map_err(|source| PlatformError::CreateDir {
        path: root.clone(),
        source,
    })?;

    Ok(root)
}
