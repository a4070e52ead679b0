//! Fixture configuration for common test scenarios.
//!
//! Bodies use inline tables so they can be parsed on their own or embedded
//! under a `[cluster.<platform>]` header.

use std::path::{Path, PathBuf};

/// Placeholder asset directory in the bodies below.
pub const FIXTURE_ASSET_DIR: &str = "/tmp/keelson-fixture";

/// A valid AWS cluster body: 3 controllers and one pool of 2 workers.
pub const AWS_BODY: &str = r#"asset_dir = '/tmp/keelson-fixture'
cluster_name = "demo"
dns_zone = "example.com"
dns_zone_id = "Z2ABCDEF"
ssh_pubkeys = ["ssh-ed25519 AAAA keelson@test"]
controller_count = 3
worker_pool = [
  { name = "general", count = 2, instance_type = "t3.small", ssh_pubkeys = ["ssh-ed25519 AAAA keelson@test"] },
]
"#;

/// A valid bare-metal cluster body: 1 controller and 2 workers.
pub const BAREMETAL_BODY: &str = r#"asset_dir = '/tmp/keelson-fixture'
cluster_name = "lab"
controller_domains = ["node1.lab"]
controller_macs = ["52:54:00:a1:9c:ae"]
controller_names = ["node1"]
worker_domains = ["node2.lab", "node3.lab"]
worker_macs = ["52:54:00:b2:2f:86", "52:54:00:c3:61:77"]
worker_names = ["node2", "node3"]
k8s_domain_name = "k8s.lab"
matchbox_ca_path = "/etc/matchbox/ca.crt"
matchbox_client_cert_path = "/etc/matchbox/client.crt"
matchbox_client_key_path = "/etc/matchbox/client.key"
matchbox_endpoint = "matchbox.lab:8081"
matchbox_http_endpoint = "http://matchbox.lab:8080"
ssh_pubkeys = ["ssh-ed25519 AAAA keelson@test"]
"#;

fn with_asset_dir(body: &str, asset_dir: &Path) -> String {
    body.replace(FIXTURE_ASSET_DIR, &asset_dir.display().to_string())
}

/// A complete AWS document whose assets go to `asset_dir`.
pub fn aws_document(asset_dir: &Path) -> String {
    format!("[cluster.aws]\n{}", with_asset_dir(AWS_BODY, asset_dir))
}

/// A complete bare-metal document whose assets go to `asset_dir`.
pub fn baremetal_document(asset_dir: &Path) -> String {
    format!(
        "[cluster.bare-metal]\n{}",
        with_asset_dir(BAREMETAL_BODY, asset_dir)
    )
}

/// Write `contents` to `dir/cluster.toml` and return the path.
pub fn write_document(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("cluster.toml");
    std::fs::write(&path, contents).expect("failed to write fixture document");
    path
}
