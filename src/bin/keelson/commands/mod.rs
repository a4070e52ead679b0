//! Command implementations

pub mod cluster;
pub mod completions;
pub mod component;
pub mod platforms;
pub mod render;
pub mod validate;
