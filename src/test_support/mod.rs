//! Test utilities for keelson unit tests.
//!
//! Provides an [`Executor`] that records calls instead of running terraform,
//! and fixture documents for both built-in platforms.
//!
//! # Example
//!
//! ```rust,ignore
//! use keelson::test_support::{fixtures, RecordingExecutor};
//!
//! #[test]
//! fn test_example() {
//!     let mut executor = RecordingExecutor::new();
//!     backend.initialize(&mut executor)?;
//!     assert_eq!(executor.calls()[0], format!("initialize {}", root.display()));
//! }
//! ```

pub mod fixtures;

use std::path::Path;

use anyhow::{bail, Result};

use crate::terraform::Executor;

/// Executor that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    calls: Vec<String>,
    fail_on: Option<&'static str>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        RecordingExecutor::default()
    }

    /// An executor whose `operation` ("initialize", "apply", "destroy")
    /// fails after being recorded.
    pub fn failing(operation: &'static str) -> Self {
        RecordingExecutor {
            calls: Vec::new(),
            fail_on: Some(operation),
        }
    }

    /// Calls made so far, e.g. `initialize /tmp/x/terraform`, `apply`.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    fn record(&mut self, operation: &'static str, call: String) -> Result<()> {
        self.calls.push(call);
        if self.fail_on == Some(operation) {
            bail!("simulated {} failure", operation);
        }
        Ok(())
    }
}

impl Executor for RecordingExecutor {
    fn initialize(&mut self, root_dir: &Path) -> Result<()> {
        self.record("initialize", format!("initialize {}", root_dir.display()))
    }

    fn apply(&mut self) -> Result<()> {
        self.record("apply", "apply".to_string())
    }

    fn destroy(&mut self) -> Result<()> {
        self.record("destroy", "destroy".to_string())
    }
}
