//! Deterministic artifact rendering.
//!
//! Templates are compile-time constants rendered with minijinja under strict
//! undefined behaviour: a template that references a value the caller did
//! not bind fails instead of silently emitting an empty string. Output is
//! written through a temporary file in the target directory and renamed into
//! place, so an interrupted render never leaves a truncated artifact behind.

mod error;

use std::io::Write;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

pub use error::RenderError;

/// Permission bits of written artifacts.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// A file produced by rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Where the artifact was written
    pub path: PathBuf,

    /// Exact text written to `path`
    pub contents: String,

    /// Hex SHA-256 of `contents`
    pub digest: String,

    /// Whether the file differed from what was on disk before
    pub changed: bool,
}

/// Template environment with a fixed set of named templates.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        TemplateRenderer { env }
    }

    /// Register a template under `name`. Syntax errors surface here.
    pub fn add_template(
        &mut self,
        name: &'static str,
        source: &'static str,
    ) -> Result<(), RenderError> {
        self.env
            .add_template(name, source)
            .map_err(|source| RenderError::Parse {
                template: name.to_string(),
                source,
            })
    }

    /// Builder-style variant of [`TemplateRenderer::add_template`].
    pub fn with_template(
        mut self,
        name: &'static str,
        source: &'static str,
    ) -> Result<Self, RenderError> {
        self.add_template(name, source)?;
        Ok(self)
    }

    /// Render `name` to a string. `target` names the intended destination
    /// in errors.
    pub fn render<S: Serialize>(
        &self,
        name: &str,
        ctx: S,
        target: &Path,
    ) -> Result<String, RenderError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|source| RenderError::Parse {
                template: name.to_string(),
                source,
            })?;

        template.render(ctx).map_err(|source| RenderError::Execute {
            path: target.to_path_buf(),
            source,
        })
    }

    /// Render `name` into `dir/file`, replacing any existing file.
    ///
    /// `dir` must already exist.
    pub fn render_to<S: Serialize>(
        &self,
        name: &str,
        ctx: S,
        dir: &Path,
        file: &str,
    ) -> Result<RenderedArtifact, RenderError> {
        let contents = self.render(name, ctx, &dir.join(file))?;
        write_artifact(dir, file, contents)
    }
}

/// Write already rendered `contents` to `dir/file`, replacing any existing
/// file.
pub fn write_artifact(
    dir: &Path,
    file: &str,
    contents: String,
) -> Result<RenderedArtifact, RenderError> {
    let path = dir.join(file);
    let changed = std::fs::read(&path).map_or(true, |prev| prev != contents.as_bytes());

    write_atomic(&path, dir, &contents)?;

    let digest = hex::encode(Sha256::digest(contents.as_bytes()));
    tracing::debug!(
        "rendered {} ({} bytes, sha256 {}{})",
        path.display(),
        contents.len(),
        &digest[..12],
        if changed { "" } else { ", unchanged" }
    );

    Ok(RenderedArtifact {
        path,
        contents,
        digest,
        changed,
    })
}

fn write_atomic(path: &Path, dir: &Path, contents: &str) -> Result<(), RenderError> {
    let create_err = |source| RenderError::CreateFile {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(create_err)?;
    tmp.write_all(contents.as_bytes()).map_err(create_err)?;
    tmp.flush().map_err(create_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Temp files start out 0600; artifacts get the usual file mode.
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE))
            .map_err(create_err)?;
    }

    tmp.persist(path).map_err(|e| RenderError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Encode `value` as JSON for templates that expect pre-encoded scalars.
///
/// Maps must be `BTreeMap`s (or otherwise ordered) to keep output stable.
pub fn to_json<T: Serialize + ?Sized>(field: &str, value: &T) -> Result<String, RenderError> {
    serde_json::to_string(value).map_err(|source| RenderError::Marshal {
        field: field.to_string(),
        source,
    })
}
