//! Component operations.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::component::ComponentRegistry;
use crate::core::document::{ClusterDocument, VariableOverrides};
use crate::ops::lifecycle::LifecycleError;
use crate::render::{write_artifact, RenderedArtifact};
use crate::util::fs::ensure_dir;

/// Options for `component render`.
#[derive(Debug, Clone)]
pub struct ComponentOptions {
    /// Path to the cluster document
    pub config: PathBuf,

    /// Variable files and assignments
    pub overrides: VariableOverrides,

    /// Component to render
    pub name: String,

    /// Directory the manifests are written to
    pub output_dir: PathBuf,
}

/// Configure a component from the document and write its manifests.
///
/// A document without a `component.<name>` table renders the defaults.
pub fn render(
    components: &ComponentRegistry,
    opts: &ComponentOptions,
) -> Result<Vec<RenderedArtifact>> {
    let mut component = components.get(&opts.name).ok_or_else(|| {
        anyhow!(
            "unknown component `{}`; available components: {}",
            opts.name,
            components.names().collect::<Vec<_>>().join(", ")
        )
    })?;

    let doc = ClusterDocument::load(&opts.config)?;
    let ctx = doc.eval_context(&opts.overrides)?;

    let diagnostics = component.load_config(doc.component_body(&opts.name), &ctx);
    if diagnostics.has_errors() {
        return Err(LifecycleError::InvalidConfig {
            diagnostics: diagnostics
                .with_subject_prefix(&format!("component.{}", opts.name))
                .with_location(&opts.config),
        }
        .into());
    }
    for warning in diagnostics.warnings() {
        tracing::warn!("{}", warning.summary);
    }

    let manifests = component
        .render_manifests()
        .with_context(|| format!("failed to render component `{}`", opts.name))?;

    ensure_dir(&opts.output_dir)?;
    let mut artifacts = Vec::with_capacity(manifests.len());
    for manifest in manifests {
        let artifact = write_artifact(&opts.output_dir, &manifest.file_name, manifest.contents)?;
        tracing::info!("wrote {}", artifact.path.display());
        artifacts.push(artifact);
    }

    tracing::info!(
        "rendered {} manifest(s) for {} into namespace `{}`",
        artifacts.len(),
        component.name(),
        component.namespace()
    );
    Ok(artifacts)
}

/// Default output directory for a component's manifests.
pub fn default_output_dir(base: &Path, name: &str) -> PathBuf {
    base.join("components").join(name)
}
