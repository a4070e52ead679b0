//! High-level operations.
//!
//! This module contains the implementation of keelson commands.

pub mod cluster;
pub mod component;
pub mod lifecycle;

pub use cluster::{validate_all, validate_document, ClusterOptions, ValidationReport};
pub use component::ComponentOptions;
pub use lifecycle::{Invocation, LifecycleError, Stage};
