//! Rendering error types.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::fs::ExpandError;

/// Failure while turning a validated model into an artifact file.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum RenderError {
    #[error("failed to parse template `{template}`")]
    #[diagnostic(code(keelson::render::parse))]
    Parse {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to marshal {field}")]
    #[diagnostic(code(keelson::render::marshal))]
    Marshal {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write template to file {}", .path.display())]
    #[diagnostic(
        code(keelson::render::execute),
        help("the template references a value the configuration did not provide")
    )]
    Execute {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to create file {}", .path.display())]
    #[diagnostic(code(keelson::render::create_file))]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to replace {}", .path.display())]
    #[diagnostic(code(keelson::render::persist))]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to expand path `{path}`")]
    #[diagnostic(code(keelson::render::expand_path))]
    ExpandPath {
        path: String,
        #[source]
        source: ExpandError,
    },
}
