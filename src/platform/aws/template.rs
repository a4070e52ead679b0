//! `cluster.tf` for AWS clusters.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use super::{AwsConfig, WorkerPool};
use crate::platform::tags::merge_default_tags;
use crate::platform::CLUSTER_FILE;
use crate::render::{to_json, RenderError, RenderedArtifact, TemplateRenderer};
use crate::util::fs::expand_home;

const TEMPLATE: &str = r#"module "aws-{{ config.cluster_name }}" {
  source = "../terraform-modules/aws/flatcar-linux/kubernetes"

  providers = {
    aws      = aws.default
    local    = local.default
    null     = null.default
    template = template.default
    tls      = tls.default
  }

  cluster_name = "{{ config.cluster_name }}"
  tags         = {{ tags }}
  dns_zone     = "{{ config.dns_zone }}"
  dns_zone_id  = "{{ config.dns_zone_id }}"
  ssh_keys     = {{ ssh_keys }}
  asset_dir    = "../cluster-assets"

  {% if config.os_name %}
  os_name = "{{ config.os_name }}"
  {% endif %}
  {% if config.os_channel %}
  os_channel = "{{ config.os_channel }}"
  {% endif %}
  {% if config.os_version %}
  os_version = "{{ config.os_version }}"
  {% endif %}
  controller_count = {{ config.controller_count }}
  {% if config.controller_type %}
  controller_type = "{{ config.controller_type }}"
  {% endif %}
  {% if config.controller_clc_snippets %}
  controller_clc_snippets = {{ controller_clc_snippets }}
  {% endif %}
  enable_aggregation = {{ enable_aggregation }}
  enable_reporting   = {{ enable_reporting }}
  {% if config.disk_size %}
  disk_size = {{ config.disk_size }}
  {% endif %}
  {% if config.disk_type %}
  disk_type = "{{ config.disk_type }}"
  {% endif %}
  {% if config.disk_iops %}
  disk_iops = {{ config.disk_iops }}
  {% endif %}
  {% if config.network_mtu %}
  network_mtu = {{ config.network_mtu }}
  {% endif %}
  {% if config.host_cidr %}
  host_cidr = "{{ config.host_cidr }}"
  {% endif %}
  {% if config.pod_cidr %}
  pod_cidr = "{{ config.pod_cidr }}"
  {% endif %}
  {% if config.service_cidr %}
  service_cidr = "{{ config.service_cidr }}"
  {% endif %}
  {% if config.cluster_domain_suffix %}
  cluster_domain_suffix = "{{ config.cluster_domain_suffix }}"
  {% endif %}
  {% if config.certs_validity_period_hours %}
  certs_validity_period_hours = {{ config.certs_validity_period_hours }}
  {% endif %}
}
{% for pool in worker_pools %}

module "worker-{{ pool.name }}" {
  source = "../terraform-modules/aws/flatcar-linux/kubernetes/workers"

  providers = {
    aws = aws.default
  }

  vpc_id          = module.aws-{{ config.cluster_name }}.vpc_id
  subnet_ids      = flatten([module.aws-{{ config.cluster_name }}.subnet_ids])
  security_groups = module.aws-{{ config.cluster_name }}.worker_security_groups
  kubeconfig      = module.aws-{{ config.cluster_name }}.kubeconfig
  lb_arn          = module.aws-{{ config.cluster_name }}.nlb_arn

  name         = "{{ pool.name }}"
  cluster_name = "{{ config.cluster_name }}"
  worker_count = {{ pool.count }}
  ssh_keys     = {{ pool.ssh_keys }}
  tags         = {{ pool.tags }}
  {% if pool.instance_type %}
  instance_type = "{{ pool.instance_type }}"
  {% endif %}
  {% if pool.os_channel %}
  os_channel = "{{ pool.os_channel }}"
  {% endif %}
  {% if pool.os_version %}
  os_version = "{{ pool.os_version }}"
  {% endif %}
  {% if pool.disk_size %}
  disk_size = {{ pool.disk_size }}
  {% endif %}
  {% if pool.disk_type %}
  disk_type = "{{ pool.disk_type }}"
  {% endif %}
  {% if pool.disk_iops %}
  disk_iops = {{ pool.disk_iops }}
  {% endif %}
  {% if pool.spot_price %}
  spot_price = "{{ pool.spot_price }}"
  {% endif %}
  {% if pool.target_groups %}
  target_groups = {{ pool.target_groups }}
  {% endif %}
  {% if pool.clc_snippets %}
  clc_snippets = {{ pool.clc_snippets }}
  {% endif %}
  {% if config.service_cidr %}
  service_cidr = "{{ config.service_cidr }}"
  {% endif %}
  {% if config.cluster_domain_suffix %}
  cluster_domain_suffix = "{{ config.cluster_domain_suffix }}"
  {% endif %}
}
{% endfor %}

provider "aws" {
  version = "2.48.0"
  alias   = "default"

  region = "{{ config.region }}"
  {% if creds_path %}
  shared_credentials_file = "{{ creds_path }}"
  {% endif %}
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

output "kubeconfig" {
  value = module.aws-{{ config.cluster_name }}.kubeconfig
}
"#;

/// Template view of one worker pool. List and map fields are JSON text.
#[derive(Serialize)]
struct PoolContext<'a> {
    name: &'a str,
    count: u32,
    instance_type: &'a str,
    os_channel: &'a str,
    os_version: &'a str,
    disk_size: u32,
    disk_type: &'a str,
    disk_iops: u32,
    spot_price: &'a str,
    ssh_keys: String,
    tags: String,
    target_groups: Option<String>,
    clc_snippets: Option<String>,
}

#[derive(Serialize)]
struct ClusterContext<'a> {
    config: &'a AwsConfig,
    tags: String,
    ssh_keys: String,
    controller_clc_snippets: Option<String>,
    enable_aggregation: String,
    enable_reporting: String,
    creds_path: String,
    worker_pools: Vec<PoolContext<'a>>,
}

fn non_empty_json(field: &str, values: &[String]) -> Result<Option<String>, RenderError> {
    if values.is_empty() {
        Ok(None)
    } else {
        to_json(field, values).map(Some)
    }
}

fn pool_context(pool: &WorkerPool) -> Result<PoolContext<'_>, RenderError> {
    let field = |name: &str| format!("{} for worker pool {:?}", name, pool.name);

    let tags: BTreeMap<String, String> = merge_default_tags(&pool.tags);

    Ok(PoolContext {
        name: &pool.name,
        count: pool.count,
        instance_type: &pool.instance_type,
        os_channel: &pool.os_channel,
        os_version: &pool.os_version,
        disk_size: pool.disk_size,
        disk_type: &pool.disk_type,
        disk_iops: pool.disk_iops,
        spot_price: &pool.spot_price,
        ssh_keys: to_json(&field("ssh_pubkeys"), &pool.ssh_pubkeys)?,
        tags: to_json(&field("tags"), &tags)?,
        target_groups: non_empty_json(&field("target_groups"), &pool.target_groups)?,
        clc_snippets: non_empty_json(&field("clc_snippets"), &pool.clc_snippets)?,
    })
}

/// Render `cluster.tf` for `config` into `root_dir`.
pub(super) fn render(config: &AwsConfig, root_dir: &Path) -> Result<RenderedArtifact, RenderError> {
    let creds_path = if config.creds_path.is_empty() {
        String::new()
    } else {
        expand_home(&config.creds_path)
            .map_err(|source| RenderError::ExpandPath {
                path: config.creds_path.clone(),
                source,
            })?
            .display()
            .to_string()
    };

    let ctx = ClusterContext {
        config,
        tags: to_json("tags", &merge_default_tags(&config.tags))?,
        ssh_keys: to_json("SSH public keys", &config.ssh_pubkeys)?,
        controller_clc_snippets: non_empty_json(
            "controller CLC snippets",
            &config.controller_clc_snippets,
        )?,
        enable_aggregation: to_json("enable_aggregation", &config.enable_aggregation)?,
        enable_reporting: to_json("enable_reporting", &config.enable_reporting)?,
        creds_path,
        worker_pools: config
            .worker_pool
            .iter()
            .map(pool_context)
            .collect::<Result<_, _>>()?,
    };

    TemplateRenderer::new()
        .with_template(CLUSTER_FILE, TEMPLATE)?
        .render_to(CLUSTER_FILE, ctx, root_dir, CLUSTER_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::tags::VERSION_TAG;
    use tempfile::TempDir;

    fn config() -> AwsConfig {
        AwsConfig {
            asset_dir: "/tmp/demo".to_string(),
            cluster_name: "demo".to_string(),
            dns_zone: "example.com".to_string(),
            dns_zone_id: "Z2ABCDEF".to_string(),
            ssh_pubkeys: vec!["ssh-ed25519 AAAA".to_string()],
            worker_pool: vec![WorkerPool {
                name: "general".to_string(),
                count: 2,
                ssh_pubkeys: vec!["ssh-ed25519 AAAA".to_string()],
                tags: BTreeMap::from([("team".to_string(), "infra".to_string())]),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_minimal_config() {
        let tmp = TempDir::new().unwrap();
        let artifact = render(&config(), tmp.path()).unwrap();

        assert_eq!(artifact.path, tmp.path().join("cluster.tf"));
        let tf = &artifact.contents;
        assert!(tf.contains("module \"aws-demo\" {"));
        assert!(tf.contains("module \"worker-general\" {"));
        assert!(tf.contains("  worker_count = 2\n"));
        assert!(tf.contains("  ssh_keys     = [\"ssh-ed25519 AAAA\"]\n"));
        assert!(tf.contains("  controller_count = 1\n"));
        assert!(tf.contains("  enable_aggregation = true\n"));
        assert!(tf.contains("  enable_reporting   = false\n"));
        assert!(tf.contains("  region = \"eu-central-1\"\n"));
        assert!(tf.contains(&format!("\"{}\":\"{}\"", VERSION_TAG, crate::VERSION)));
        assert!(tf.contains("\"team\":\"infra\""));
    }

    #[test]
    fn test_empty_optional_fields_are_omitted() {
        let tmp = TempDir::new().unwrap();
        let tf = render(&config(), tmp.path()).unwrap().contents;

        for absent in [
            "os_channel",
            "controller_type",
            "disk_size",
            "network_mtu",
            "pod_cidr",
            "spot_price",
            "target_groups",
            "clc_snippets",
            "shared_credentials_file",
        ] {
            assert!(!tf.contains(absent), "{} should not be rendered", absent);
        }
        assert!(!tf.contains("\n\n\n"));
    }

    #[test]
    fn test_optional_fields_rendered_when_set() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config();
        cfg.controller_type = "t3.medium".to_string();
        cfg.network_mtu = 8981;
        cfg.creds_path = "/etc/aws/credentials".to_string();
        cfg.worker_pool[0].target_groups = vec!["tg-1".to_string()];
        cfg.worker_pool[0].spot_price = "0.01".to_string();

        let tf = render(&cfg, tmp.path()).unwrap().contents;

        assert!(tf.contains("  controller_type = \"t3.medium\"\n"));
        assert!(tf.contains("  network_mtu = 8981\n"));
        assert!(tf.contains("  shared_credentials_file = \"/etc/aws/credentials\"\n"));
        assert!(tf.contains("  target_groups = [\"tg-1\"]\n"));
        assert!(tf.contains("  spot_price = \"0.01\"\n"));
    }

    #[test]
    fn test_booleans_render_as_hcl_literals() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config();
        cfg.enable_aggregation = false;
        cfg.enable_reporting = true;

        let tf = render(&cfg, tmp.path()).unwrap().contents;

        assert!(tf.contains("  enable_aggregation = false\n"));
        assert!(tf.contains("  enable_reporting   = true\n"));
        assert!(!tf.contains("True"));
        assert!(!tf.contains("False"));
    }

    #[test]
    fn test_render_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let first = render(&config(), tmp.path()).unwrap();
        let second = render(&config(), tmp.path()).unwrap();

        assert_eq!(first.contents, second.contents);
        assert_eq!(first.digest, second.digest);
        assert!(!second.changed);
    }

    #[test]
    fn test_render_does_not_touch_model_tags() {
        let tmp = TempDir::new().unwrap();
        let cfg = config();
        render(&cfg, tmp.path()).unwrap();

        assert!(cfg.tags.is_empty());
        assert_eq!(cfg.worker_pool[0].tags.len(), 1);
    }
}
