//! Validation rules for bare-metal clusters.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::BareMetalConfig;
use crate::util::diagnostic::{Diagnostic, Diagnostics};

static MAC_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").expect("pattern is valid")
});

/// Run every rule against `config`, in order.
pub fn check_valid_config(config: &BareMetalConfig) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    diagnostics.extend(check_list_lengths(
        "controller",
        &config.controller_names,
        &config.controller_macs,
        &config.controller_domains,
    ));
    diagnostics.extend(check_list_lengths(
        "worker",
        &config.worker_names,
        &config.worker_macs,
        &config.worker_domains,
    ));
    diagnostics.extend(check_mac_format(config));
    diagnostics.extend(check_macs_unique(config));
    diagnostics.extend(check_names_unique(config));
    diagnostics.extend(check_cached_install(config));
    diagnostics.extend(check_controller_count(config));

    diagnostics
}

fn check_list_lengths(
    role: &str,
    names: &[String],
    macs: &[String],
    domains: &[String],
) -> Diagnostics {
    if names.len() == macs.len() && macs.len() == domains.len() {
        return Diagnostics::new();
    }

    Diagnostic::error(format!("Mismatched {} lists", role))
        .with_detail(format!(
            "{role}_names has {}, {role}_macs has {} and {role}_domains has {} entries; each {role} needs one of each",
            names.len(),
            macs.len(),
            domains.len(),
        ))
        .with_subject(format!("{}_macs", role))
        .into()
}

fn all_macs(config: &BareMetalConfig) -> impl Iterator<Item = (String, &str)> {
    let controllers = config
        .controller_macs
        .iter()
        .enumerate()
        .map(|(i, mac)| (format!("controller_macs[{}]", i), mac.as_str()));
    let workers = config
        .worker_macs
        .iter()
        .enumerate()
        .map(|(i, mac)| (format!("worker_macs[{}]", i), mac.as_str()));

    controllers.chain(workers)
}

fn check_mac_format(config: &BareMetalConfig) -> Diagnostics {
    all_macs(config)
        .filter(|(_, mac)| !MAC_ADDRESS.is_match(mac))
        .map(|(subject, mac)| {
            Diagnostic::error("Invalid MAC address")
                .with_detail(format!(
                    "'{}' is not a MAC address of the form 52:54:00:a1:9c:ae",
                    mac
                ))
                .with_subject(subject)
        })
        .collect()
}

fn check_macs_unique(config: &BareMetalConfig) -> Diagnostics {
    let mut seen = HashSet::new();

    all_macs(config)
        .filter(|(_, mac)| !seen.insert(mac.to_ascii_lowercase()))
        .map(|(subject, mac)| {
            Diagnostic::error("MAC addresses should be unique")
                .with_detail(format!("MAC address '{}' is duplicated", mac))
                .with_subject(subject)
        })
        .collect()
}

fn check_names_unique(config: &BareMetalConfig) -> Diagnostics {
    let mut seen = HashSet::new();

    let controllers = config
        .controller_names
        .iter()
        .enumerate()
        .map(|(i, name)| (format!("controller_names[{}]", i), name.as_str()));
    let workers = config
        .worker_names
        .iter()
        .enumerate()
        .map(|(i, name)| (format!("worker_names[{}]", i), name.as_str()));

    controllers
        .chain(workers)
        .filter(|&(_, name)| !seen.insert(name))
        .map(|(subject, name)| {
            Diagnostic::error("Node names should be unique")
                .with_detail(format!("Node name '{}' is duplicated", name))
                .with_subject(subject)
        })
        .collect()
}

fn check_cached_install(config: &BareMetalConfig) -> Diagnostics {
    if matches!(config.cached_install.as_str(), "true" | "false") {
        return Diagnostics::new();
    }

    Diagnostic::error("Invalid cached_install value")
        .with_detail(format!(
            "cached_install must be \"true\" or \"false\", got '{}'",
            config.cached_install
        ))
        .with_subject("cached_install")
        .into()
}

fn check_controller_count(config: &BareMetalConfig) -> Diagnostics {
    let count = config.controller_names.len();
    if count == 0 || count % 2 != 0 {
        return Diagnostics::new();
    }

    Diagnostic::warning("Even number of controllers")
        .with_detail(format!(
            "etcd needs a majority of members; {} controllers tolerate no more failures than {}",
            count,
            count - 1
        ))
        .with_subject("controller_names")
        .into()
}
