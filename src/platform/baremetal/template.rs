//! `cluster.tf` for bare-metal clusters.

use std::path::Path;

use serde::Serialize;

use super::BareMetalConfig;
use crate::platform::CLUSTER_FILE;
use crate::render::{to_json, RenderError, RenderedArtifact, TemplateRenderer};
use crate::util::fs::expand_home;

const TEMPLATE: &str = r#"module "bare-metal-{{ cluster_name }}" {
  source = "../terraform-modules/bare-metal/flatcar-linux/kubernetes"

  providers = {
    local    = local.default
    null     = null.default
    template = template.default
    tls      = tls.default
  }

  cached_install         = "{{ cached_install }}"
  cluster_name           = "{{ cluster_name }}"
  k8s_domain_name        = "{{ k8s_domain_name }}"
  matchbox_http_endpoint = "{{ matchbox_http_endpoint }}"
  os_channel             = "{{ os_channel }}"
  os_version             = "{{ os_version }}"
  ssh_keys               = {{ ssh_keys }}
  asset_dir              = "../cluster-assets"

  controller_domains = {{ controller_domains }}
  controller_macs    = {{ controller_macs }}
  controller_names   = {{ controller_names }}
  {% if has_workers %}

  worker_domains = {{ worker_domains }}
  worker_macs    = {{ worker_macs }}
  worker_names   = {{ worker_names }}
  {% endif %}
}

provider "matchbox" {
  version     = "0.3.0"
  endpoint    = "{{ matchbox_endpoint }}"
  client_cert = file("{{ matchbox_client_cert }}")
  client_key  = file("{{ matchbox_client_key }}")
  ca          = file("{{ matchbox_ca }}")
}

provider "local" {
  version = "~> 1.2"
  alias   = "default"
}

provider "null" {
  version = "~> 2.1"
  alias   = "default"
}

provider "template" {
  version = "~> 2.1"
  alias   = "default"
}

provider "tls" {
  version = "~> 2.0"
  alias   = "default"
}

output "initialized" {
  value = true
}
"#;

#[derive(Serialize)]
struct ClusterContext<'a> {
    cached_install: &'a str,
    cluster_name: &'a str,
    k8s_domain_name: &'a str,
    matchbox_endpoint: &'a str,
    matchbox_http_endpoint: &'a str,
    matchbox_ca: String,
    matchbox_client_cert: String,
    matchbox_client_key: String,
    os_channel: &'a str,
    os_version: &'a str,
    ssh_keys: String,
    controller_domains: String,
    controller_macs: String,
    controller_names: String,
    has_workers: bool,
    worker_domains: String,
    worker_macs: String,
    worker_names: String,
}

fn expanded(path: &str) -> Result<String, RenderError> {
    expand_home(path)
        .map(|p| p.display().to_string())
        .map_err(|source| RenderError::ExpandPath {
            path: path.to_string(),
            source,
        })
}

/// Render `cluster.tf` for `config` into `root_dir`.
pub(super) fn render(
    config: &BareMetalConfig,
    root_dir: &Path,
) -> Result<RenderedArtifact, RenderError> {
    let ctx = ClusterContext {
        cached_install: &config.cached_install,
        cluster_name: &config.cluster_name,
        k8s_domain_name: &config.k8s_domain_name,
        matchbox_endpoint: &config.matchbox_endpoint,
        matchbox_http_endpoint: &config.matchbox_http_endpoint,
        matchbox_ca: expanded(&config.matchbox_ca_path)?,
        matchbox_client_cert: expanded(&config.matchbox_client_cert_path)?,
        matchbox_client_key: expanded(&config.matchbox_client_key_path)?,
        os_channel: &config.os_channel,
        os_version: &config.os_version,
        ssh_keys: to_json("SSH public keys", &config.ssh_pubkeys)?,
        controller_domains: to_json("controller_domains", &config.controller_domains)?,
        controller_macs: to_json("controller_macs", &config.controller_macs)?,
        controller_names: to_json("controller_names", &config.controller_names)?,
        has_workers: !config.worker_names.is_empty(),
        worker_domains: to_json("worker_domains", &config.worker_domains)?,
        worker_macs: to_json("worker_macs", &config.worker_macs)?,
        worker_names: to_json("worker_names", &config.worker_names)?,
    };

    TemplateRenderer::new()
        .with_template(CLUSTER_FILE, TEMPLATE)?
        .render_to(CLUSTER_FILE, ctx, root_dir, CLUSTER_FILE)
}
