//! AWS platform backend.

mod template;
mod validate;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::core::eval::EvalContext;
use crate::core::schema::{decode_into, Attribute, Block, BodySchema};
use crate::platform::{Meta, PlatformBackend, PlatformRegistry};
use crate::render::{RenderError, RenderedArtifact};
use crate::util::diagnostic::Diagnostics;

pub use validate::{check_valid_config, MAX_NAME_LEN};

/// Registry name of this backend.
pub const NAME: &str = "aws";

static WORKER_POOL_SCHEMA: BodySchema = BodySchema {
    attributes: &[
        Attribute::required("name"),
        Attribute::required("count"),
        Attribute::required("ssh_pubkeys"),
        Attribute::optional("instance_type"),
        Attribute::optional("os_channel"),
        Attribute::optional("os_version"),
        Attribute::optional("disk_size"),
        Attribute::optional("disk_type"),
        Attribute::optional("disk_iops"),
        Attribute::optional("spot_price"),
        Attribute::optional("target_groups"),
        Attribute::optional("clc_snippets"),
        Attribute::optional("tags"),
    ],
    blocks: &[],
};

static CLUSTER_SCHEMA: BodySchema = BodySchema {
    attributes: &[
        Attribute::required("asset_dir"),
        Attribute::required("cluster_name"),
        Attribute::optional("tags"),
        Attribute::optional("os_name"),
        Attribute::optional("os_channel"),
        Attribute::optional("os_version"),
        Attribute::required("dns_zone"),
        Attribute::required("dns_zone_id"),
        Attribute::required("ssh_pubkeys"),
        Attribute::optional("creds_path"),
        Attribute::optional("controller_count"),
        Attribute::optional("controller_type"),
        Attribute::optional("controller_clc_snippets"),
        Attribute::optional("region"),
        Attribute::optional("enable_aggregation"),
        Attribute::optional("disk_size"),
        Attribute::optional("disk_type"),
        Attribute::optional("disk_iops"),
        Attribute::optional("network_mtu"),
        Attribute::optional("host_cidr"),
        Attribute::optional("pod_cidr"),
        Attribute::optional("service_cidr"),
        Attribute::optional("cluster_domain_suffix"),
        Attribute::optional("enable_reporting"),
        Attribute::optional("certs_validity_period_hours"),
    ],
    blocks: &[Block {
        name: "worker_pool",
        schema: &WORKER_POOL_SCHEMA,
    }],
};

/// A homogeneous group of worker nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPool {
    pub name: String,
    pub count: u32,
    pub ssh_pubkeys: Vec<String>,
    pub instance_type: String,
    pub os_channel: String,
    pub os_version: String,
    pub disk_size: u32,
    pub disk_type: String,
    pub disk_iops: u32,
    pub spot_price: String,
    pub target_groups: Vec<String>,
    pub clc_snippets: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

/// Settings of an AWS cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub asset_dir: String,
    pub cluster_name: String,
    pub tags: BTreeMap<String, String>,
    pub os_name: String,
    pub os_channel: String,
    pub os_version: String,
    pub dns_zone: String,
    pub dns_zone_id: String,
    pub ssh_pubkeys: Vec<String>,
    pub creds_path: String,
    pub controller_count: u32,
    pub controller_type: String,
    pub controller_clc_snippets: Vec<String>,
    pub region: String,
    pub enable_aggregation: bool,
    pub disk_size: u32,
    pub disk_type: String,
    pub disk_iops: u32,
    pub network_mtu: u32,
    pub host_cidr: String,
    pub pod_cidr: String,
    pub service_cidr: String,
    pub cluster_domain_suffix: String,
    pub enable_reporting: bool,
    pub certs_validity_period_hours: u32,
    pub worker_pool: Vec<WorkerPool>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        AwsConfig {
            asset_dir: String::new(),
            cluster_name: String::new(),
            tags: BTreeMap::new(),
            os_name: String::new(),
            os_channel: String::new(),
            os_version: String::new(),
            dns_zone: String::new(),
            dns_zone_id: String::new(),
            ssh_pubkeys: Vec::new(),
            creds_path: String::new(),
            controller_count: 1,
            controller_type: String::new(),
            controller_clc_snippets: Vec::new(),
            region: "eu-central-1".to_string(),
            enable_aggregation: true,
            disk_size: 0,
            disk_type: String::new(),
            disk_iops: 0,
            network_mtu: 0,
            host_cidr: String::new(),
            pod_cidr: String::new(),
            service_cidr: String::new(),
            cluster_domain_suffix: String::new(),
            enable_reporting: false,
            certs_validity_period_hours: 0,
            worker_pool: Vec::new(),
        }
    }
}

/// The AWS backend.
#[derive(Debug, Clone, Default)]
pub struct AwsBackend {
    config: AwsConfig,
}

impl AwsBackend {
    pub fn new() -> Self {
        AwsBackend::default()
    }

    pub fn with_config(config: AwsConfig) -> Self {
        AwsBackend { config }
    }

    pub fn config(&self) -> &AwsConfig {
        &self.config
    }
}

fn factory() -> Box<dyn PlatformBackend> {
    Box::new(AwsBackend::new())
}

/// Add the AWS backend to `registry`.
pub fn register(registry: &mut PlatformRegistry) {
    registry.register(NAME, factory);
}

impl PlatformBackend for AwsBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Flatcar Container Linux on AWS EC2"
    }

    fn decode(&mut self, body: Option<&Value>, ctx: &EvalContext) -> Diagnostics {
        decode_into(&mut self.config, body, ctx, &CLUSTER_SCHEMA)
    }

    fn validate(&self) -> Diagnostics {
        check_valid_config(&self.config)
    }

    fn meta(&self) -> Meta {
        let workers: usize = self
            .config
            .worker_pool
            .iter()
            .map(|pool| pool.count as usize)
            .sum();

        Meta {
            asset_dir: self.config.asset_dir.clone(),
            expected_nodes: self.config.controller_count as usize + workers,
        }
    }

    fn render(&self, root_dir: &Path) -> Result<RenderedArtifact, RenderError> {
        template::render(&self.config, root_dir)
    }
}
