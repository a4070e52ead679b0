//! The per-invocation backend state machine.
//!
//! ```text
//! Unconfigured -> Decoded -> Validated -> Rendered -> Applied
//!                                                 \-> Destroyed
//! ```
//!
//! Each transition either succeeds and advances the stage, or fails and
//! leaves the stage untouched. There is no way back to an earlier stage;
//! recovery is a fresh [`Invocation`], which is safe because rendering is
//! idempotent.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;
use toml::Value;

use crate::core::eval::EvalContext;
use crate::platform::{prepare_root_dir, Meta, PlatformBackend, PlatformError};
use crate::render::RenderedArtifact;
use crate::terraform::Executor;
use crate::util::diagnostic::Diagnostics;

/// Where an invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unconfigured,
    Decoded,
    Validated,
    Rendered,
    Applied,
    Destroyed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Unconfigured => "unconfigured",
            Stage::Decoded => "decoded",
            Stage::Validated => "validated",
            Stage::Rendered => "rendered",
            Stage::Applied => "applied",
            Stage::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Failure of a lifecycle transition.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum LifecycleError {
    #[error(
        "configuration is invalid: {} error(s), {} warning(s)",
        .diagnostics.error_count(),
        .diagnostics.warnings().count()
    )]
    #[diagnostic(code(keelson::lifecycle::invalid_config))]
    InvalidConfig { diagnostics: Diagnostics },

    #[error("cannot {operation} a configuration that is {stage}")]
    #[diagnostic(code(keelson::lifecycle::invalid_transition))]
    InvalidTransition {
        operation: &'static str,
        stage: Stage,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Platform(#[from] PlatformError),
}

/// One run of a backend through its lifecycle.
pub struct Invocation {
    backend: Box<dyn PlatformBackend>,
    stage: Stage,
    diagnostics: Diagnostics,
    artifact: Option<RenderedArtifact>,
}

impl Invocation {
    pub fn new(backend: Box<dyn PlatformBackend>) -> Self {
        Invocation {
            backend,
            stage: Stage::Unconfigured,
            diagnostics: Diagnostics::new(),
            artifact: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn backend(&self) -> &dyn PlatformBackend {
        self.backend.as_ref()
    }

    /// Diagnostics from the last `load`, including non-blocking warnings.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Artifact written by `render` or `initialize`.
    pub fn artifact(&self) -> Option<&RenderedArtifact> {
        self.artifact.as_ref()
    }

    fn expect_stage(&self, expected: Stage, operation: &'static str) -> Result<(), LifecycleError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                operation,
                stage: self.stage,
            })
        }
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!("{}: {} -> {}", self.backend.name(), self.stage, stage);
        self.stage = stage;
    }

    /// Decode and validate `body`.
    ///
    /// Decode errors leave the invocation `Unconfigured`; validation errors
    /// leave it `Decoded`. Warnings never block.
    pub fn load(
        &mut self,
        body: Option<&Value>,
        ctx: &EvalContext,
    ) -> Result<&Diagnostics, LifecycleError> {
        self.expect_stage(Stage::Unconfigured, "load")?;

        let mut diagnostics = self.backend.decode(body, ctx);
        if diagnostics.has_errors() {
            return Err(LifecycleError::InvalidConfig { diagnostics });
        }
        self.advance(Stage::Decoded);

        diagnostics.extend(self.backend.validate());
        if diagnostics.has_errors() {
            return Err(LifecycleError::InvalidConfig { diagnostics });
        }

        for warning in diagnostics.warnings() {
            tracing::warn!("{}", warning.summary);
        }

        self.diagnostics = diagnostics;
        self.advance(Stage::Validated);
        Ok(&self.diagnostics)
    }

    /// Summary of the validated configuration.
    pub fn meta(&self) -> Result<Meta, LifecycleError> {
        if self.stage < Stage::Validated {
            return Err(LifecycleError::InvalidTransition {
                operation: "describe",
                stage: self.stage,
            });
        }
        Ok(self.backend.meta())
    }

    /// Render artifacts into the asset directory without involving an
    /// executor.
    pub fn render(&mut self) -> Result<&RenderedArtifact, LifecycleError> {
        self.expect_stage(Stage::Validated, "render")?;

        let root = prepare_root_dir(&self.backend.meta().asset_dir)?;
        let artifact = self.backend.render(&root).map_err(PlatformError::from)?;

        self.advance(Stage::Rendered);
        Ok(self.artifact.insert(artifact))
    }

    /// Render artifacts and point `executor` at them.
    pub fn initialize(
        &mut self,
        executor: &mut dyn Executor,
    ) -> Result<&RenderedArtifact, LifecycleError> {
        self.expect_stage(Stage::Validated, "initialize")?;

        let artifact = self.backend.initialize(executor)?;
        tracing::info!(
            "{} {}",
            if artifact.changed { "wrote" } else { "unchanged" },
            artifact.path.display()
        );

        self.advance(Stage::Rendered);
        Ok(self.artifact.insert(artifact))
    }

    /// Create or update the infrastructure.
    pub fn apply(&mut self, executor: &mut dyn Executor) -> Result<(), LifecycleError> {
        self.expect_stage(Stage::Rendered, "apply")?;

        tracing::info!("applying {} cluster", self.backend.name());
        self.backend.apply(executor)?;

        self.advance(Stage::Applied);
        Ok(())
    }

    /// Tear the infrastructure down.
    pub fn destroy(&mut self, executor: &mut dyn Executor) -> Result<(), LifecycleError> {
        self.expect_stage(Stage::Rendered, "destroy")?;

        tracing::info!("destroying {} cluster", self.backend.name());
        self.backend.destroy(executor)?;

        self.advance(Stage::Destroyed);
        Ok(())
    }
}
