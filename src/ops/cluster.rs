//! Cluster operations: validate, render, apply, destroy.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;

use crate::component::ComponentRegistry;
use crate::core::document::{ClusterDocument, VariableOverrides};
use crate::ops::lifecycle::{Invocation, LifecycleError};
use crate::platform::{Meta, PlatformRegistry};
use crate::render::RenderedArtifact;
use crate::terraform::Executor;
use crate::util::diagnostic::{Diagnostic, Diagnostics};

/// Options shared by the cluster commands.
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Path to the cluster document
    pub config: PathBuf,

    /// Variable files and assignments
    pub overrides: VariableOverrides,
}

/// Outcome of validating one document.
#[derive(Debug)]
pub struct ValidationReport {
    pub path: PathBuf,

    /// Selected platform, when the document names one
    pub platform: Option<String>,

    /// Every decode and validation finding, in order
    pub diagnostics: Diagnostics,

    /// Present when the cluster configuration is valid
    pub meta: Option<Meta>,
}

impl ValidationReport {
    /// Whether the document passes. With `deny_warnings`, warnings fail too.
    pub fn passed(&self, deny_warnings: bool) -> bool {
        !self.diagnostics.has_errors() && !(deny_warnings && self.diagnostics.has_warnings())
    }
}

/// Load `opts.config` into an invocation that has reached `Validated`.
pub fn load(platforms: &PlatformRegistry, opts: &ClusterOptions) -> Result<Invocation> {
    let doc = ClusterDocument::load(&opts.config)?;
    let ctx = doc.eval_context(&opts.overrides)?;
    let (platform, body) = doc.cluster()?;

    let backend = platforms.get(platform).ok_or_else(|| {
        anyhow!(
            "unknown platform `{}` in {}; available platforms: {}",
            platform,
            opts.config.display(),
            platforms.names().collect::<Vec<_>>().join(", ")
        )
    })?;

    let mut invocation = Invocation::new(backend);
    invocation
        .load(Some(body), &ctx)
        .map_err(|e| locate(e, &opts.config, platform))?;

    Ok(invocation)
}

/// Attach the document path and the `cluster.<platform>` prefix to
/// configuration diagnostics.
fn locate(err: LifecycleError, path: &Path, platform: &str) -> LifecycleError {
    match err {
        LifecycleError::InvalidConfig { diagnostics } => LifecycleError::InvalidConfig {
            diagnostics: diagnostics
                .with_subject_prefix(&format!("cluster.{}", platform))
                .with_location(path),
        },
        other => other,
    }
}

/// Decode and validate one document, collecting everything that is wrong
/// with it instead of stopping at the first problem.
pub fn validate_document(
    platforms: &PlatformRegistry,
    components: &ComponentRegistry,
    path: &Path,
    overrides: &VariableOverrides,
) -> ValidationReport {
    let mut report = ValidationReport {
        path: path.to_path_buf(),
        platform: None,
        diagnostics: Diagnostics::new(),
        meta: None,
    };

    let loaded = ClusterDocument::load(path).and_then(|doc| {
        let ctx = doc.eval_context(overrides)?;
        Ok((doc, ctx))
    });
    let (doc, ctx) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            report
                .diagnostics
                .push(Diagnostic::error(format!("{:#}", e)).with_location(path));
            return report;
        }
    };

    match doc.cluster() {
        Ok((platform, body)) => {
            report.platform = Some(platform.to_string());
            match platforms.get(platform) {
                Some(backend) => {
                    let mut invocation = Invocation::new(backend);
                    match invocation.load(Some(body), &ctx) {
                        Ok(diags) => {
                            report.diagnostics.extend(
                                diags
                                    .clone()
                                    .with_subject_prefix(&format!("cluster.{}", platform)),
                            );
                            report.meta = invocation.meta().ok();
                        }
                        Err(e) => match locate(e, path, platform) {
                            LifecycleError::InvalidConfig { diagnostics } => {
                                report.diagnostics.extend(diagnostics)
                            }
                            other => report
                                .diagnostics
                                .push(Diagnostic::error(other.to_string())),
                        },
                    }
                }
                None => report.diagnostics.push(
                    Diagnostic::error("Unknown platform")
                        .with_detail(format!(
                            "`{}` is not a known platform; available platforms: {}",
                            platform,
                            platforms.names().collect::<Vec<_>>().join(", ")
                        ))
                        .with_subject(format!("cluster.{}", platform)),
                ),
            }
        }
        Err(e) => report.diagnostics.push(Diagnostic::error(e.to_string())),
    }

    for name in doc.component_names() {
        let subject = format!("component.{}", name);
        match components.get(name) {
            Some(mut component) => report.diagnostics.extend(
                component
                    .load_config(doc.component_body(name), &ctx)
                    .with_subject_prefix(&subject),
            ),
            None => report.diagnostics.push(
                Diagnostic::error("Unknown component")
                    .with_detail(format!(
                        "`{}` is not a known component; available components: {}",
                        name,
                        components.names().collect::<Vec<_>>().join(", ")
                    ))
                    .with_subject(subject),
            ),
        }
    }

    report.diagnostics = report.diagnostics.with_location(path);
    report
}

/// Validate many documents in parallel. Reports keep the order of `paths`.
pub fn validate_all(
    platforms: &PlatformRegistry,
    components: &ComponentRegistry,
    paths: &[PathBuf],
    overrides: &VariableOverrides,
) -> Vec<ValidationReport> {
    paths
        .par_iter()
        .map(|path| validate_document(platforms, components, path, overrides))
        .collect()
}

/// Validate and render the cluster artifacts without touching
/// infrastructure.
pub fn render(platforms: &PlatformRegistry, opts: &ClusterOptions) -> Result<RenderedArtifact> {
    let mut invocation = load(platforms, opts)?;
    let artifact = invocation
        .render()
        .with_context(|| format!("failed to render {}", opts.config.display()))?;
    Ok(artifact.clone())
}

/// Run the full lifecycle through apply.
pub fn apply(
    platforms: &PlatformRegistry,
    opts: &ClusterOptions,
    executor: &mut dyn Executor,
) -> Result<Meta> {
    let mut invocation = load(platforms, opts)?;
    invocation.initialize(executor)?;
    invocation.apply(executor)?;

    let meta = invocation.meta()?;
    tracing::info!(
        "cluster applied; expecting {} node(s) to join",
        meta.expected_nodes
    );
    Ok(meta)
}

/// Run the full lifecycle through destroy.
pub fn destroy(
    platforms: &PlatformRegistry,
    opts: &ClusterOptions,
    executor: &mut dyn Executor,
) -> Result<()> {
    let mut invocation = load(platforms, opts)?;
    invocation.initialize(executor)?;
    invocation.destroy(executor)?;

    tracing::info!("cluster destroyed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component;
    use crate::platform;
    use crate::test_support::{fixtures, RecordingExecutor};
    use tempfile::TempDir;

    fn options(path: PathBuf) -> ClusterOptions {
        ClusterOptions {
            config: path,
            overrides: VariableOverrides::default(),
        }
    }

    #[test]
    fn test_validate_valid_document() {
        let tmp = TempDir::new().unwrap();
        let path = fixtures::write_document(tmp.path(), &fixtures::aws_document(tmp.path()));

        let report = validate_document(
            &platform::builtin_registry(),
            &component::builtin_registry(),
            &path,
            &VariableOverrides::default(),
        );

        assert!(report.passed(true), "{}", report.diagnostics);
        assert_eq!(report.platform.as_deref(), Some("aws"));
        assert_eq!(report.meta.unwrap().expected_nodes, 5);
    }

    #[test]
    fn test_validate_reports_cluster_and_component_problems() {
        let tmp = TempDir::new().unwrap();
        let doc = format!(
            "{}\n[component.rook-ceph]\nmonitor_count = 0\n\n[component.unknown]\n",
            fixtures::aws_document(tmp.path()).replace("cluster_name = \"demo\"", "cluster_name = \"a-very-long-cluster-name\"")
        );
        let path = fixtures::write_document(tmp.path(), &doc);

        let report = validate_document(
            &platform::builtin_registry(),
            &component::builtin_registry(),
            &path,
            &VariableOverrides::default(),
        );

        let subjects: Vec<_> = report
            .diagnostics
            .iter()
            .filter_map(|d| d.subject.clone())
            .collect();
        assert_eq!(
            subjects,
            vec![
                "cluster.aws.cluster_name",
                "component.rook-ceph.monitor_count",
                "component.unknown",
            ]
        );
        assert!(report.meta.is_none());
        assert!(report
            .diagnostics
            .iter()
            .all(|d| d.location.as_deref() == Some(path.as_path())));
    }

    #[test]
    fn test_validate_unknown_platform() {
        let tmp = TempDir::new().unwrap();
        let path = fixtures::write_document(tmp.path(), "[cluster.gcp]\nregion = \"x\"\n");

        let report = validate_document(
            &platform::builtin_registry(),
            &component::builtin_registry(),
            &path,
            &VariableOverrides::default(),
        );

        assert!(!report.passed(false));
        assert_eq!(report.diagnostics.iter().next().unwrap().summary, "Unknown platform");
    }

    #[test]
    fn test_validate_all_keeps_order() {
        let tmp = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..4 {
            let dir = tmp.path().join(format!("c{}", i));
            std::fs::create_dir_all(&dir).unwrap();
            let doc = if i % 2 == 0 {
                fixtures::aws_document(&dir)
            } else {
                fixtures::baremetal_document(&dir)
            };
            paths.push(fixtures::write_document(&dir, &doc));
        }

        let reports = validate_all(
            &platform::builtin_registry(),
            &component::builtin_registry(),
            &paths,
            &VariableOverrides::default(),
        );

        let order: Vec<_> = reports.iter().map(|r| r.path.clone()).collect();
        assert_eq!(order, paths);
        assert_eq!(reports[1].platform.as_deref(), Some("bare-metal"));
        assert!(reports.iter().all(|r| r.passed(false)));
    }

    #[test]
    fn test_load_error_lists_diagnostics_with_prefix() {
        let tmp = TempDir::new().unwrap();
        let path = fixtures::write_document(
            tmp.path(),
            &fixtures::aws_document(tmp.path()).replace("dns_zone_id = \"Z2ABCDEF\"\n", ""),
        );

        let err = load(&platform::builtin_registry(), &options(path)).err().unwrap();
        let lifecycle = err.downcast_ref::<LifecycleError>().unwrap();

        let LifecycleError::InvalidConfig { diagnostics } = lifecycle else {
            panic!("expected invalid config");
        };
        assert_eq!(
            diagnostics.iter().next().unwrap().subject.as_deref(),
            Some("cluster.aws.dns_zone_id")
        );
    }

    #[test]
    fn test_apply_and_destroy() {
        let tmp = TempDir::new().unwrap();
        let path = fixtures::write_document(tmp.path(), &fixtures::baremetal_document(tmp.path()));
        let platforms = platform::builtin_registry();

        let mut executor = RecordingExecutor::new();
        let meta = apply(&platforms, &options(path.clone()), &mut executor).unwrap();
        assert_eq!(meta.expected_nodes, 3);

        destroy(&platforms, &options(path), &mut executor).unwrap();
        let root = tmp.path().join("terraform");
        assert_eq!(
            executor.calls(),
            &[
                format!("initialize {}", root.display()),
                "apply".to_string(),
                format!("initialize {}", root.display()),
                "destroy".to_string(),
            ]
        );
        assert!(root.join("cluster.tf").exists());
    }

    #[test]
    fn test_variables_flow_into_render() {
        let tmp = TempDir::new().unwrap();
        let doc = fixtures::aws_document(tmp.path())
            .replace("cluster_name = \"demo\"", "cluster_name = \"${var.name}\"")
            .replace("[cluster.aws]", "[variables]\nname = \"from-doc\"\n\n[cluster.aws]");
        let path = fixtures::write_document(tmp.path(), &doc);

        let opts = ClusterOptions {
            config: path,
            overrides: VariableOverrides {
                var_files: Vec::new(),
                vars: vec!["name=from-flag".to_string()],
            },
        };

        let artifact = render(&platform::builtin_registry(), &opts).unwrap();
        assert!(artifact.contents.contains("module \"aws-from-flag\""));
    }
}
