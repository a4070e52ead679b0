//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use keelson::core::{VariableOverrides, DEFAULT_DOCUMENT_NAME};

/// keelson - Kubernetes cluster provisioning from a single document
#[derive(Parser)]
#[command(name = "keelson")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the terraform binary
    #[arg(long, global = true, env = "KEELSON_TERRAFORM")]
    pub terraform: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check cluster documents and report every problem found
    Validate(ValidateArgs),

    /// Validate and render the cluster artifacts without provisioning
    Render(DocumentArgs),

    /// Provision or tear down a cluster
    Cluster(ClusterArgs),

    /// Render cluster components
    Component(ComponentArgs),

    /// List available platforms and components
    Platforms,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Variable sources shared by every command that reads a document.
#[derive(Args)]
pub struct VarArgs {
    /// TOML file of variable values (may be repeated)
    #[arg(long = "var-file", value_name = "FILE")]
    pub var_files: Vec<PathBuf>,

    /// Set a variable (NAME=VALUE, may be repeated)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,
}

impl VarArgs {
    pub fn overrides(&self) -> VariableOverrides {
        VariableOverrides {
            var_files: self.var_files.clone(),
            vars: self.vars.clone(),
        }
    }
}

#[derive(Args)]
pub struct DocumentArgs {
    /// Cluster document
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_DOCUMENT_NAME)]
    pub config: PathBuf,

    #[command(flatten)]
    pub vars: VarArgs,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Cluster documents to check (defaults to cluster.toml)
    pub files: Vec<PathBuf>,

    /// Fail on warnings as well as errors
    #[arg(long)]
    pub deny_warnings: bool,

    #[command(flatten)]
    pub vars: VarArgs,
}

#[derive(Args)]
pub struct ClusterArgs {
    #[command(subcommand)]
    pub command: ClusterCommands,
}

#[derive(Subcommand)]
pub enum ClusterCommands {
    /// Render the artifacts and create or update the cluster
    Apply(DocumentArgs),

    /// Render the artifacts and destroy the cluster
    Destroy(DocumentArgs),
}

#[derive(Args)]
pub struct ComponentArgs {
    #[command(subcommand)]
    pub command: ComponentCommands,
}

#[derive(Subcommand)]
pub enum ComponentCommands {
    /// Write a component's manifests
    Render(ComponentRenderArgs),
}

#[derive(Args)]
pub struct ComponentRenderArgs {
    /// Component name
    pub name: String,

    /// Output directory (defaults to components/<NAME> next to the document)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub document: DocumentArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
