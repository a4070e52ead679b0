//! Bare-metal platform backend.
//!
//! Machines are PXE-booted through a matchbox server. Nodes are described by
//! three parallel lists (names, MAC addresses, domains) per role.

mod template;
mod validate;

use std::path::Path;

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::core::eval::EvalContext;
use crate::core::schema::{decode_into, Attribute, BodySchema};
use crate::platform::{Meta, PlatformBackend, PlatformRegistry};
use crate::render::{RenderError, RenderedArtifact};
use crate::util::diagnostic::Diagnostics;

pub use validate::check_valid_config;

/// Registry name of this backend.
pub const NAME: &str = "bare-metal";

static CLUSTER_SCHEMA: BodySchema = BodySchema {
    attributes: &[
        Attribute::required("asset_dir"),
        Attribute::optional("cached_install"),
        Attribute::required("cluster_name"),
        Attribute::required("controller_domains"),
        Attribute::required("controller_macs"),
        Attribute::required("controller_names"),
        Attribute::required("k8s_domain_name"),
        Attribute::required("matchbox_ca_path"),
        Attribute::required("matchbox_client_cert_path"),
        Attribute::required("matchbox_client_key_path"),
        Attribute::required("matchbox_endpoint"),
        Attribute::required("matchbox_http_endpoint"),
        Attribute::optional("os_channel"),
        Attribute::optional("os_version"),
        Attribute::required("ssh_pubkeys"),
        Attribute::optional("worker_names"),
        Attribute::optional("worker_macs"),
        Attribute::optional("worker_domains"),
    ],
    blocks: &[],
};

/// Settings of a bare-metal cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BareMetalConfig {
    pub asset_dir: String,
    pub cached_install: String,
    pub cluster_name: String,
    pub controller_domains: Vec<String>,
    pub controller_macs: Vec<String>,
    pub controller_names: Vec<String>,
    pub k8s_domain_name: String,
    pub matchbox_ca_path: String,
    pub matchbox_client_cert_path: String,
    pub matchbox_client_key_path: String,
    pub matchbox_endpoint: String,
    pub matchbox_http_endpoint: String,
    pub os_channel: String,
    pub os_version: String,
    pub ssh_pubkeys: Vec<String>,
    pub worker_names: Vec<String>,
    pub worker_macs: Vec<String>,
    pub worker_domains: Vec<String>,
}

impl Default for BareMetalConfig {
    fn default() -> Self {
        BareMetalConfig {
            asset_dir: String::new(),
            cached_install: "false".to_string(),
            cluster_name: String::new(),
            controller_domains: Vec::new(),
            controller_macs: Vec::new(),
            controller_names: Vec::new(),
            k8s_domain_name: String::new(),
            matchbox_ca_path: String::new(),
            matchbox_client_cert_path: String::new(),
            matchbox_client_key_path: String::new(),
            matchbox_endpoint: String::new(),
            matchbox_http_endpoint: String::new(),
            os_channel: "flatcar-stable".to_string(),
            os_version: "current".to_string(),
            ssh_pubkeys: Vec::new(),
            worker_names: Vec::new(),
            worker_macs: Vec::new(),
            worker_domains: Vec::new(),
        }
    }
}

/// The bare-metal backend.
#[derive(Debug, Clone, Default)]
pub struct BareMetalBackend {
    config: BareMetalConfig,
}

impl BareMetalBackend {
    pub fn new() -> Self {
        BareMetalBackend::default()
    }

    pub fn with_config(config: BareMetalConfig) -> Self {
        BareMetalBackend { config }
    }

    pub fn config(&self) -> &BareMetalConfig {
        &self.config
    }
}

fn factory() -> Box<dyn PlatformBackend> {
    Box::new(BareMetalBackend::new())
}

/// Add the bare-metal backend to `registry`.
pub fn register(registry: &mut PlatformRegistry) {
    registry.register(NAME, factory);
}

impl PlatformBackend for BareMetalBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Flatcar Container Linux on PXE-booted machines via matchbox"
    }

    fn decode(&mut self, body: Option<&Value>, ctx: &EvalContext) -> Diagnostics {
        decode_into(&mut self.config, body, ctx, &CLUSTER_SCHEMA)
    }

    fn validate(&self) -> Diagnostics {
        check_valid_config(&self.config)
    }

    fn meta(&self) -> Meta {
        Meta {
            asset_dir: self.config.asset_dir.clone(),
            expected_nodes: self.config.controller_macs.len() + self.config.worker_macs.len(),
        }
    }

    fn render(&self, root_dir: &Path) -> Result<RenderedArtifact, RenderError> {
        template::render(&self.config, root_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;

    #[test]
    fn test_absent_body_keeps_defaults() {
        let mut backend = BareMetalBackend::new();
        let diags = backend.load_config(None, &EvalContext::new());

        assert!(diags.is_empty());
        assert_eq!(backend.config().cached_install, "false");
        assert_eq!(backend.config().os_channel, "flatcar-stable");
        assert_eq!(backend.config().os_version, "current");
    }

    #[test]
    fn test_valid_config_loads() {
        let body = Value::Table(toml::from_str(fixtures::BAREMETAL_BODY).unwrap());
        let mut backend = BareMetalBackend::new();

        let diags = backend.load_config(Some(&body), &EvalContext::new());

        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(backend.config().controller_names, vec!["node1"]);
        assert_eq!(backend.meta().expected_nodes, 3);
    }

    #[test]
    fn test_missing_matchbox_settings_all_reported() {
        let body = Value::Table(
            toml::from_str(
                r#"
asset_dir = "/tmp/bm"
cluster_name = "lab"
controller_domains = ["node1.lab"]
controller_macs = ["52:54:00:a1:9c:ae"]
controller_names = ["node1"]
k8s_domain_name = "k8s.lab"
ssh_pubkeys = ["ssh-ed25519 AAAA"]
"#,
            )
            .unwrap(),
        );
        let mut backend = BareMetalBackend::new();

        let diags = backend.load_config(Some(&body), &EvalContext::new());

        assert_eq!(diags.error_count(), 5);
    }
}
