//! Rook Ceph storage cluster.

use std::path::Path;

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::component::{Component, ComponentRegistry, Manifest};
use crate::core::eval::EvalContext;
use crate::core::schema::{decode_into, Attribute, Block, BodySchema};
use crate::render::{to_json, RenderError, TemplateRenderer};
use crate::util::diagnostic::{Diagnostic, Diagnostics};

/// Registry name of this component.
pub const NAME: &str = "rook-ceph";

const CLUSTER_MANIFEST: &str = "ceph-cluster.yaml";

const CEPH_CLUSTER: &str = r#"apiVersion: ceph.rook.io/v1
kind: CephCluster
metadata:
  name: rook-ceph
  namespace: {{ namespace }}
spec:
  cephVersion:
    image: ceph/ceph:v14.2.1-20190430
    allowUnsupported: true
  dataDirHostPath: /var/lib/rook
  mon:
    count: {{ monitor_count }}
    allowMultiplePerNode: false
  dashboard:
    enabled: true
  network:
    hostNetwork: false
  rbdMirroring:
    workers: 0
  placement:
    all:
      {% if node_selectors %}
      nodeAffinity:
        requiredDuringSchedulingIgnoredDuringExecution:
          nodeSelectorTerms:
            - matchExpressions:
              {% for item in node_selectors %}
              - key: {{ item.key }}
                operator: {{ item.operator }}
                {% if item.values %}
                values:
                  {% for value in item.values %}
                  - {{ value }}
                  {% endfor %}
                {% endif %}
              {% endfor %}
      {% endif %}
      {% if tolerations %}
      tolerations: {{ tolerations }}
      {% endif %}
  storage:
    useAllNodes: true
    useAllDevices: true
    config:
      {% if metadata_device %}
      metadataDevice: "{{ metadata_device }}"
      {% endif %}
      storeType: bluestore
      osdsPerDevice: "1"
"#;

const OPERATORS: &[&str] = &["In", "NotIn", "Exists", "DoesNotExist", "Gt", "Lt"];

static NODE_SELECTOR_SCHEMA: BodySchema = BodySchema {
    attributes: &[
        Attribute::required("key"),
        Attribute::required("operator"),
        Attribute::optional("values"),
    ],
    blocks: &[],
};

static TOLERATION_SCHEMA: BodySchema = BodySchema {
    attributes: &[
        Attribute::optional("key"),
        Attribute::optional("effect"),
        Attribute::optional("operator"),
        Attribute::optional("value"),
        Attribute::optional("toleration_seconds"),
    ],
    blocks: &[],
};

static SCHEMA: BodySchema = BodySchema {
    attributes: &[
        Attribute::optional("namespace"),
        Attribute::optional("monitor_count"),
        Attribute::optional("metadata_device"),
    ],
    blocks: &[
        Block {
            name: "node_selector",
            schema: &NODE_SELECTOR_SCHEMA,
        },
        Block {
            name: "toleration",
            schema: &TOLERATION_SCHEMA,
        },
    ],
};

/// A node affinity match expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSelector {
    pub key: String,
    pub operator: String,
    pub values: Vec<String>,
}

/// A pod toleration, serialized with Kubernetes field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Toleration {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub effect: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toleration_seconds: Option<i64>,
}

/// Settings of the Rook Ceph cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RookCephConfig {
    pub namespace: String,
    pub monitor_count: u32,
    pub metadata_device: String,
    pub node_selector: Vec<NodeSelector>,
    pub toleration: Vec<Toleration>,
}

impl Default for RookCephConfig {
    fn default() -> Self {
        RookCephConfig {
            namespace: "rook".to_string(),
            monitor_count: 1,
            metadata_device: String::new(),
            node_selector: Vec::new(),
            toleration: Vec::new(),
        }
    }
}

/// The rook-ceph component.
#[derive(Debug, Clone, Default)]
pub struct RookCeph {
    config: RookCephConfig,
}

impl RookCeph {
    pub fn new() -> Self {
        RookCeph::default()
    }

    pub fn config(&self) -> &RookCephConfig {
        &self.config
    }
}

fn factory() -> Box<dyn Component> {
    Box::new(RookCeph::new())
}

/// Add rook-ceph to `registry`.
pub fn register(registry: &mut ComponentRegistry) {
    registry.register(NAME, factory);
}

fn check_valid_config(config: &RookCephConfig) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    if config.monitor_count == 0 {
        diagnostics.push(
            Diagnostic::error("Invalid monitor count")
                .with_detail("monitor_count must be at least 1")
                .with_subject("monitor_count"),
        );
    }

    for (i, selector) in config.node_selector.iter().enumerate() {
        let subject = format!("node_selector[{}]", i);
        let values = selector.values.len();

        let problem = match selector.operator.as_str() {
            "In" | "NotIn" if values == 0 => Some("requires at least one value"),
            "Exists" | "DoesNotExist" if values != 0 => Some("does not take values"),
            "Gt" | "Lt" if values != 1 => Some("requires exactly one value"),
            op if !OPERATORS.contains(&op) => {
                diagnostics.push(
                    Diagnostic::error("Invalid node selector operator")
                        .with_detail(format!(
                            "'{}' is not one of: {}",
                            op,
                            OPERATORS.join(", ")
                        ))
                        .with_subject(format!("{}.operator", subject)),
                );
                None
            }
            _ => None,
        };

        if let Some(problem) = problem {
            diagnostics.push(
                Diagnostic::error("Invalid node selector values")
                    .with_detail(format!("operator '{}' {}", selector.operator, problem))
                    .with_subject(format!("{}.values", subject)),
            );
        }
    }

    diagnostics
}

#[derive(Serialize)]
struct ManifestContext<'a> {
    namespace: &'a str,
    monitor_count: u32,
    metadata_device: &'a str,
    node_selectors: &'a [NodeSelector],
    tolerations: Option<String>,
}

impl Component for RookCeph {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Ceph storage cluster managed by the Rook operator"
    }

    fn load_config(&mut self, body: Option<&Value>, ctx: &EvalContext) -> Diagnostics {
        if body.is_none() {
            return Diagnostics::new();
        }

        let mut diags = decode_into(&mut self.config, body, ctx, &SCHEMA);
        if !diags.has_errors() {
            diags.extend(check_valid_config(&self.config));
        }
        diags
    }

    fn namespace(&self) -> &str {
        &self.config.namespace
    }

    fn render_manifests(&self) -> Result<Vec<Manifest>, RenderError> {
        let tolerations = if self.config.toleration.is_empty() {
            None
        } else {
            Some(to_json("tolerations", &self.config.toleration)?)
        };

        let ctx = ManifestContext {
            namespace: &self.config.namespace,
            monitor_count: self.config.monitor_count,
            metadata_device: &self.config.metadata_device,
            node_selectors: &self.config.node_selector,
            tolerations,
        };

        let contents = TemplateRenderer::new()
            .with_template(CLUSTER_MANIFEST, CEPH_CLUSTER)?
            .render(CLUSTER_MANIFEST, ctx, Path::new(CLUSTER_MANIFEST))?;

        Ok(vec![Manifest {
            file_name: CLUSTER_MANIFEST.to_string(),
            contents,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(src: &str) -> (RookCeph, Diagnostics) {
        let body = Value::Table(toml::from_str(src).unwrap());
        let mut component = RookCeph::new();
        let diags = component.load_config(Some(&body), &EvalContext::new());
        (component, diags)
    }

    fn manifest(component: &RookCeph) -> String {
        component.render_manifests().unwrap().remove(0).contents
    }

    #[test]
    fn test_absent_body_keeps_defaults() {
        let mut component = RookCeph::new();
        assert!(component
            .load_config(None, &EvalContext::new())
            .is_empty());
        assert_eq!(component.config(), &RookCephConfig::default());
    }

    #[test]
    fn test_defaults_omit_optional_sections() {
        let text = manifest(&RookCeph::new());

        assert!(text.contains("  namespace: rook\n"));
        assert!(text.contains("    count: 1\n"));
        assert!(!text.contains("nodeAffinity"));
        assert!(!text.contains("tolerations"));
        assert!(!text.contains("metadataDevice"));
        assert!(text.contains("    all:\n  storage:\n"));
    }

    #[test]
    fn test_full_configuration_rendered() {
        let (component, diags) = load(
            r#"
namespace = "storage"
monitor_count = 3
metadata_device = "md127"

[[node_selector]]
key = "node-role.kubernetes.io/storage"
operator = "Exists"

[[node_selector]]
key = "zone"
operator = "In"
values = ["a", "b"]

[[toleration]]
key = "storage"
effect = "NoSchedule"
operator = "Exists"
"#,
        );
        assert!(diags.is_empty(), "{}", diags);

        let text = manifest(&component);
        assert!(text.contains("  namespace: storage\n"));
        assert!(text.contains("    count: 3\n"));
        assert!(text.contains(
            "              - key: node-role.kubernetes.io/storage\n                operator: Exists\n              - key: zone\n"
        ));
        assert!(text.contains("                values:\n                  - a\n                  - b\n"));
        assert!(text.contains(
            r#"      tolerations: [{"key":"storage","effect":"NoSchedule","operator":"Exists"}]"#
        ));
        assert!(text.contains("      metadataDevice: \"md127\"\n"));
    }

    #[test]
    fn test_operator_rules() {
        let (_, diags) = load(
            r#"
monitor_count = 0

[[node_selector]]
key = "a"
operator = "In"

[[node_selector]]
key = "b"
operator = "Exists"
values = ["x"]

[[node_selector]]
key = "c"
operator = "Near"
"#,
        );

        let subjects: Vec<_> = diags.iter().filter_map(|d| d.subject.clone()).collect();
        assert_eq!(
            subjects,
            vec![
                "monitor_count",
                "node_selector[0].values",
                "node_selector[1].values",
                "node_selector[2].operator",
            ]
        );
    }

    #[test]
    fn test_selector_requires_key_and_operator() {
        let (_, diags) = load("[[node_selector]]\nvalues = [\"a\"]\n");

        assert_eq!(diags.error_count(), 2);
        assert!(diags
            .iter()
            .all(|d| d.summary == "Missing required argument"));
    }
}
