//! Validation rules for AWS clusters.
//!
//! Each rule observes the model and returns its own diagnostics; the rules
//! run in a fixed order and their output is concatenated.

use std::collections::HashSet;

use super::AwsConfig;
use crate::util::diagnostic::{Diagnostic, Diagnostics};

/// AWS caps the names of several resources (load balancers, target groups)
/// at 32 characters.
pub const MAX_RESOURCE_NAME: usize = 32;

/// Longest suffix appended to a cluster or pool name.
pub const LONGEST_SUFFIX: &str = "-workers-https";

/// Longest cluster or worker pool name that still fits.
pub const MAX_NAME_LEN: usize = MAX_RESOURCE_NAME - LONGEST_SUFFIX.len();

/// Run every rule against `config`.
pub fn check_valid_config(config: &AwsConfig) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    diagnostics.extend(check_not_empty_workers(config));
    diagnostics.extend(check_worker_pool_names_unique(config));
    diagnostics.extend(check_name_sizes(config));
    diagnostics.extend(check_controller_count(config));
    diagnostics.extend(check_worker_counts(config));

    diagnostics
}

fn check_not_empty_workers(config: &AwsConfig) -> Diagnostics {
    if !config.worker_pool.is_empty() {
        return Diagnostics::new();
    }

    Diagnostic::error("At least one worker pool must be defined")
        .with_detail("Make sure to define at least one worker pool block in your cluster block")
        .into()
}

fn check_worker_pool_names_unique(config: &AwsConfig) -> Diagnostics {
    let mut seen = HashSet::new();

    config
        .worker_pool
        .iter()
        .enumerate()
        .filter(|&(_, pool)| !seen.insert(pool.name.as_str()))
        .map(|(i, pool)| {
            Diagnostic::error("Worker pools name should be unique")
                .with_detail(format!("Worker pool '{}' is duplicated", pool.name))
                .with_subject(format!("worker_pool[{}].name", i))
        })
        .collect()
}

fn check_name_sizes(config: &AwsConfig) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    if config.cluster_name.chars().count() > MAX_NAME_LEN {
        diagnostics.push(
            Diagnostic::error("Cluster name too long")
                .with_detail(format!("Maximum length is {}", MAX_NAME_LEN))
                .with_subject("cluster_name"),
        );
    }

    for (i, pool) in config.worker_pool.iter().enumerate() {
        if pool.name.chars().count() > MAX_NAME_LEN {
            diagnostics.push(
                Diagnostic::error("Worker pool name too long")
                    .with_detail(format!("Maximum length is {}", MAX_NAME_LEN))
                    .with_subject(format!("worker_pool[{}].name", i)),
            );
        }
    }

    diagnostics
}

fn check_controller_count(config: &AwsConfig) -> Diagnostics {
    if config.controller_count == 0 {
        return Diagnostic::error("At least one controller is required")
            .with_detail("controller_count must be 1 or more")
            .with_subject("controller_count")
            .into();
    }

    if config.controller_count % 2 == 0 {
        return Diagnostic::warning("Even number of controllers")
            .with_detail(format!(
                "etcd needs a majority of members; {} controllers tolerate no more failures than {}",
                config.controller_count,
                config.controller_count - 1
            ))
            .with_subject("controller_count")
            .into();
    }

    Diagnostics::new()
}

fn check_worker_counts(config: &AwsConfig) -> Diagnostics {
    config
        .worker_pool
        .iter()
        .enumerate()
        .filter(|(_, pool)| pool.count == 0)
        .map(|(i, pool)| {
            Diagnostic::warning("Worker pool has no nodes")
                .with_detail(format!("Worker pool '{}' has count 0", pool.name))
                .with_subject(format!("worker_pool[{}].count", i))
        })
        .collect()
}
