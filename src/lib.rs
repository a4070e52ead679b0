//! keelson - Kubernetes cluster provisioning from a single document
//!
//! This crate provides the core library functionality for keelson,
//! including configuration decoding, validation, deterministic rendering
//! of terraform artifacts, and the provisioning lifecycle.

pub mod component;
pub mod core;
pub mod ops;
pub mod platform;
pub mod render;
pub mod terraform;
pub mod util;

/// Test utilities for keelson unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a recording executor and fixture documents.
#[cfg(test)]
pub mod test_support;

/// Version of this build, stamped into resource tags.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::component::{Component, ComponentRegistry};
pub use crate::core::{ClusterDocument, EvalContext, VariableOverrides};
pub use crate::ops::{Invocation, LifecycleError, Stage};
pub use crate::platform::{Meta, PlatformBackend, PlatformRegistry};
pub use crate::terraform::{Executor, TerraformExecutor};
pub use crate::util::diagnostic::{Diagnostic, Diagnostics};
