//! The operator's cluster document.
//!
//! A document is a TOML file with three top-level tables:
//!
//! ```toml
//! [variables]
//! cluster_name = "demo"
//!
//! [cluster.aws]
//! cluster_name = "${var.cluster_name}"
//!
//! [component.rook-ceph]
//! namespace = "rook"
//! ```
//!
//! Exactly one `cluster.<platform>` table selects the backend. Component
//! tables are optional.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use toml::Value;

use crate::core::eval::EvalContext;

/// Document read when no `--config` is given.
pub const DEFAULT_DOCUMENT_NAME: &str = "cluster.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    variables: toml::Table,

    #[serde(default)]
    cluster: BTreeMap<String, Value>,

    #[serde(default)]
    component: BTreeMap<String, Value>,
}

/// A parsed cluster document.
#[derive(Debug, Clone)]
pub struct ClusterDocument {
    path: PathBuf,
    variables: toml::Table,
    clusters: BTreeMap<String, Value>,
    components: BTreeMap<String, Value>,
}

/// Variable sources layered over a document's `[variables]` table.
#[derive(Debug, Clone, Default)]
pub struct VariableOverrides {
    /// TOML files of `NAME = value` pairs, applied in order
    pub var_files: Vec<PathBuf>,

    /// `NAME=VALUE` assignments, applied last
    pub vars: Vec<String>,
}

impl ClusterDocument {
    /// Load a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read cluster document: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse document content. `path` is used for messages only.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawDocument = toml::from_str(content)
            .with_context(|| format!("failed to parse cluster document: {}", path.display()))?;

        tracing::debug!(
            "parsed {}: {} cluster table(s), {} component table(s)",
            path.display(),
            raw.cluster.len(),
            raw.component.len()
        );

        Ok(ClusterDocument {
            path: path.to_path_buf(),
            variables: raw.variables,
            clusters: raw.cluster,
            components: raw.component,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The selected platform name and its body.
    ///
    /// A document must contain exactly one `cluster.<platform>` table.
    pub fn cluster(&self) -> Result<(&str, &Value)> {
        let mut clusters = self.clusters.iter();

        match (clusters.next(), clusters.next()) {
            (Some((name, body)), None) => Ok((name.as_str(), body)),
            (None, _) => bail!(
                "no cluster block found in {}; add a `[cluster.<platform>]` table",
                self.path.display()
            ),
            (Some(_), Some(_)) => bail!(
                "{} declares more than one cluster block ({}); exactly one is allowed",
                self.path.display(),
                self.clusters
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Body of `component.<name>`, if present.
    pub fn component_body(&self, name: &str) -> Option<&Value> {
        self.components.get(name)
    }

    /// Names of configured components in sorted order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Build the evaluation context: `[variables]`, then each var file,
    /// then each `NAME=VALUE` assignment.
    pub fn eval_context(&self, overrides: &VariableOverrides) -> Result<EvalContext> {
        let mut ctx = EvalContext::new();
        ctx.merge_table(&self.variables);

        for file in &overrides.var_files {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read variables file: {}", file.display()))?;
            let table: toml::Table = toml::from_str(&content)
                .with_context(|| format!("failed to parse variables file: {}", file.display()))?;
            ctx.merge_table(&table);
        }

        for assignment in &overrides.vars {
            let (name, value) = parse_assignment(assignment)?;
            ctx.set(name, value);
        }

        Ok(ctx)
    }
}

/// Parse a `NAME=VALUE` assignment.
///
/// The value is read as a TOML value when it is one (`3`, `true`,
/// `["a", "b"]`), otherwise it is taken as a plain string.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = assignment.split_once('=') else {
        bail!("invalid variable assignment `{}`, expected NAME=VALUE", assignment);
    };

    let name = name.trim();
    if name.is_empty() {
        bail!("invalid variable assignment `{}`, name is empty", assignment);
    }

    let value = toml::from_str::<toml::Table>(&format!("v = {}", raw))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_string()));

    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(src: &str) -> ClusterDocument {
        ClusterDocument::parse(src, Path::new("cluster.toml")).unwrap()
    }

    #[test]
    fn test_single_cluster_is_selected() {
        let doc = parse("[cluster.aws]\ncluster_name = \"demo\"\n[component.rook-ceph]\n");

        let (platform, body) = doc.cluster().unwrap();
        assert_eq!(platform, "aws");
        assert_eq!(body["cluster_name"].as_str(), Some("demo"));
        assert!(doc.component_body("rook-ceph").is_some());
        assert_eq!(doc.component_names().collect::<Vec<_>>(), vec!["rook-ceph"]);
    }

    #[test]
    fn test_missing_cluster_block() {
        let err = parse("[variables]\na = 1\n").cluster().unwrap_err();
        assert!(err.to_string().contains("no cluster block"));
    }

    #[test]
    fn test_multiple_cluster_blocks() {
        let err = parse("[cluster.aws]\n[cluster.bare-metal]\n")
            .cluster()
            .unwrap_err();
        assert!(err.to_string().contains("aws, bare-metal"));
    }

    #[test]
    fn test_unknown_top_level_table_rejected() {
        let result = ClusterDocument::parse("[clusters.aws]\n", Path::new("cluster.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_variable_precedence() {
        let tmp = TempDir::new().unwrap();
        let var_file = tmp.path().join("prod.toml");
        std::fs::write(&var_file, "region = \"us-east-1\"\nworkers = 2\n").unwrap();

        let doc = parse("[variables]\nregion = \"eu-central-1\"\nname = \"demo\"\nworkers = 1\n");
        let ctx = doc
            .eval_context(&VariableOverrides {
                var_files: vec![var_file],
                vars: vec!["workers=5".to_string()],
            })
            .unwrap();

        assert_eq!(ctx.get("name").and_then(Value::as_str), Some("demo"));
        assert_eq!(ctx.get("region").and_then(Value::as_str), Some("us-east-1"));
        assert_eq!(ctx.get("workers").and_then(Value::as_integer), Some(5));
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("count=3").unwrap(),
            ("count".to_string(), Value::Integer(3))
        );
        assert_eq!(
            parse_assignment("name=demo-1").unwrap(),
            ("name".to_string(), Value::String("demo-1".into()))
        );
        assert_eq!(
            parse_assignment("url=http://x?a=b").unwrap().1,
            Value::String("http://x?a=b".into())
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }
}
