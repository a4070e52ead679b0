//! Core configuration machinery for keelson.
//!
//! This module contains the pieces shared by every backend and component:
//! - The cluster document and its variable sources
//! - Variable evaluation
//! - Schema-checked decoding into typed configuration
//! - The named factory registry

pub mod document;
pub mod eval;
pub mod registry;
pub mod schema;

pub use document::{ClusterDocument, VariableOverrides, DEFAULT_DOCUMENT_NAME};
pub use eval::EvalContext;
pub use registry::Registry;
pub use schema::{decode_body, decode_into, Attribute, Block, BodySchema};
