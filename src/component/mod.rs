//! Cluster components.
//!
//! A component is configured by a `component.<name>` table and renders
//! Kubernetes manifests. Manifest bodies are opaque templates; only their
//! placeholders are known here.

pub mod rook_ceph;

use toml::Value;

use crate::core::eval::EvalContext;
use crate::core::registry::Registry;
use crate::render::RenderError;
use crate::util::diagnostic::Diagnostics;

/// Registry of components.
pub type ComponentRegistry = Registry<dyn Component>;

/// A registry holding every built-in component.
pub fn builtin_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new("component");
    rook_ceph::register(&mut registry);
    registry
}

/// One rendered manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub file_name: String,
    pub contents: String,
}

/// The contract every component implements.
pub trait Component {
    /// Registry name, also the key of the `component.<name>` table.
    fn name(&self) -> &'static str;

    /// One-line description for listings.
    fn description(&self) -> &'static str;

    /// Decode and validate `body`. An absent body keeps the defaults.
    fn load_config(&mut self, body: Option<&Value>, ctx: &EvalContext) -> Diagnostics;

    /// Namespace the manifests are installed into.
    fn namespace(&self) -> &str;

    /// Render every manifest of the component.
    fn render_manifests(&self) -> Result<Vec<Manifest>, RenderError>;
}
