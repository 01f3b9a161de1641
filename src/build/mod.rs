//! Package build pipeline.
//!
//! ```text
//! Collector → DependencyGraphBuilder → classify → BundlePlanner
//!                                                      ↓
//!      VersionWriter ← LogWriter ← bundle files ← ArchiveBuilder
//!            ↓
//!      Encryptor (optional) → encrypted VersionWriter → version_index + 1
//! ```
//!
//! A build is all-or-nothing with respect to the version index: it is bumped
//! in the [`PackageConfig`] only after every step above has succeeded. A
//! failed build may leave a partially written output tree, which is untrusted
//! until a later build of the same package succeeds.
//!
//! Every build carries its own [`BuildSession`]; there is no process-wide
//! build state, so independent builders can run side by side.

pub mod encrypt;
pub mod logs;
pub mod version;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::classifier::classify;
use crate::collector::{CollectError, Collector};
use crate::graph::{DependencyGraph, DependencyGraphBuilder, GraphError};
use crate::planner::{BundlePlanner, PlanError};
use crate::provider::{ArchiveBuilder, DependencyProvider};
use crate::types::{AssetRules, BundleKind, BundlePlan, ConfigError, PackageConfig, ProjectConfig, VersionLog};

pub use encrypt::{decrypt, encrypt, xor_in_place, EncryptError, Encryptor};
pub use logs::{
    parse_log, render_depend_log, render_file_log, write_logs, LoadIndex, LogError, LogLine,
    DEPEND_LOG, FILE_LOG,
};
pub use version::{crc32, verify_tree, ChecksumMismatch, ManifestError, VersionWriter};

/// Manifest timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Error type for a package build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Package configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Candidate collection failed.
    #[error(transparent)]
    Collect(#[from] CollectError),
    /// Dependency graph construction failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Planning failed.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// The archive builder failed.
    #[error("Archive building failed for package {package}: {message}")]
    Archive {
        /// Package name.
        package: String,
        /// Builder error message.
        message: String,
    },
    /// The archive builder returned archives that do not match the plan.
    #[error("Archive builder broke its contract for package {package}: missing {missing:?}, unexpected {unexpected:?}")]
    ArchiveContract {
        /// Package name.
        package: String,
        /// Planned bundles without an archive.
        missing: Vec<String>,
        /// Archives for bundles that were never planned.
        unexpected: Vec<String>,
    },
    /// Writing the output tree failed.
    #[error("Output error at {path}: {source}")]
    Output {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Writing the loader logs failed.
    #[error(transparent)]
    Logs(#[from] LogError),
    /// Writing a manifest failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The encryption pass failed.
    #[error(transparent)]
    Encrypt(#[from] EncryptError),
}

/// Per-build state threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct BuildSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// Package being built.
    pub package: String,
    /// Target platform identifier.
    pub target_platform: String,
    /// When the build started.
    pub started_at: DateTime<Local>,
}

impl BuildSession {
    /// Start a new session.
    pub fn new(package: impl Into<String>, target_platform: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            package: package.into(),
            target_platform: target_platform.into(),
            started_at: Local::now(),
        }
    }

    /// Manifest timestamp of this session.
    pub fn timestamp(&self) -> String {
        self.started_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Outcome of a successful package build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Session that produced this build.
    pub session: BuildSession,
    /// Version index written and persisted.
    pub version_index: u64,
    /// Plan fingerprint.
    pub plan_hash: String,
    /// Bundles owned by scene entries, in scene path order.
    pub scene_bundles: Vec<String>,
    /// Plaintext tree manifest.
    pub plaintext: VersionLog,
    /// Encrypted tree manifest, if encryption is enabled.
    pub encrypted: Option<VersionLog>,
    /// Plaintext output directory.
    pub output_dir: PathBuf,
    /// Encrypted output directory, if encryption is enabled.
    pub encrypted_dir: Option<PathBuf>,
}

/// Builds packages of one project.
///
/// Generic over the host capabilities so the whole pipeline runs against
/// in-memory providers in tests.
pub struct PackageBuilder<P: DependencyProvider, A: ArchiveBuilder> {
    project_root: PathBuf,
    content_root: String,
    output_root: PathBuf,
    encrypted_folder: String,
    target_platform: String,
    rules: AssetRules,
    provider: P,
    archiver: A,
}

impl<P: DependencyProvider, A: ArchiveBuilder> PackageBuilder<P, A> {
    /// Create a builder from project settings and host capabilities.
    pub fn new(project: &ProjectConfig, provider: P, archiver: A) -> Self {
        Self {
            project_root: project.project_root.clone(),
            content_root: project.content_root.clone(),
            output_root: project.output_root.clone(),
            encrypted_folder: project.encrypted_folder.clone(),
            target_platform: project.target_platform.clone(),
            rules: project.rules.clone(),
            provider,
            archiver,
        }
    }

    /// Plaintext output directory of a package.
    pub fn output_dir(&self, package: &str) -> PathBuf {
        self.output_root.join(package)
    }

    /// Encrypted output directory of a package.
    pub fn encrypted_dir(&self, package: &str) -> PathBuf {
        self.output_root.join(&self.encrypted_folder).join(package)
    }

    /// Collect, analyze and plan a package without writing anything.
    pub fn plan_package(&self, package: &PackageConfig) -> Result<(DependencyGraph, BundlePlan), BuildError> {
        let candidates = Collector::new(&self.project_root, &self.rules).collect(package)?;
        let graph = DependencyGraphBuilder::new(&self.provider, &self.rules, &self.content_root)
            .build(&candidates)?;
        let classification = classify(&graph);
        let plan = BundlePlanner::new(package).plan(&graph, &classification)?;
        Ok((graph, plan))
    }

    /// Build one package and bump its version index on success.
    pub fn build_package(&self, package: &mut PackageConfig) -> Result<BuildReport, BuildError> {
        package.validate_in(&self.encrypted_folder)?;

        let session = BuildSession::new(&package.name, &self.target_platform);
        let span = info_span!("package_build", package = %package.name, session = %session.id);
        let _guard = span.enter();

        let (graph, plan) = self.plan_package(package)?;
        let mut scene_bundles = Vec::with_capacity(graph.scenes.len());
        for scene in &graph.scenes {
            if let Some(bundle) = plan.bundle_of(scene) {
                debug!(scene = %scene, bundle, "scene bundle");
                scene_bundles.push(bundle.to_string());
            }
        }
        info!(
            entries = graph.entries.len(),
            scenes = scene_bundles.len(),
            shared = plan.entries_of(BundleKind::SharedDependency).count(),
            shaders = graph.shaders.len(),
            "package planned"
        );

        let archives = self
            .archiver
            .build_archives(&plan, &package.build_options, &session.target_platform)
            .map_err(|e| BuildError::Archive {
                package: package.name.clone(),
                message: e.to_string(),
            })?;
        check_archive_contract(&plan, &archives)?;

        let version_index = package.version_index + 1;
        let output_dir = self.output_dir(&package.name);
        reset_dir(&output_dir)?;

        let mut files = Vec::with_capacity(archives.len());
        for (bundle_name, bytes) in &archives {
            let file_name = format!("{}{}", bundle_name, package.bundle_suffix);
            let path = output_dir.join(&file_name);
            std::fs::write(&path, bytes).map_err(|source| BuildError::Output { path, source })?;
            files.push(file_name);
        }
        write_logs(&output_dir, &plan)?;

        let writer = VersionWriter::new(session.timestamp(), version_index);
        let plaintext = writer.write(&output_dir, &files, false)?;

        let (encrypted, encrypted_dir) = if package.encrypt {
            let encryptor = Encryptor::new(&package.secret)?;
            let dir = self.encrypted_dir(&package.name);
            reset_dir(&dir)?;
            encryptor.mirror_tree(&output_dir, &dir, &files, &[FILE_LOG, DEPEND_LOG])?;
            let log = writer.write(&dir, &files, true)?;
            (Some(log), Some(dir))
        } else {
            (None, None)
        };

        package.version_index = version_index;
        info!(
            version_index,
            bundles = files.len(),
            plan_hash = %plan.plan_hash,
            encrypted = package.encrypt,
            "package build complete"
        );

        Ok(BuildReport {
            session,
            version_index,
            plan_hash: plan.plan_hash,
            scene_bundles,
            plaintext,
            encrypted,
            output_dir,
            encrypted_dir,
        })
    }

    /// Build every package independently. A failing package does not stop
    /// the others.
    pub fn build_all(&self, packages: &mut [PackageConfig]) -> Vec<(String, Result<BuildReport, BuildError>)> {
        packages
            .iter_mut()
            .map(|package| {
                let result = self.build_package(package);
                if let Err(e) = &result {
                    warn!(package = %package.name, error = %e, "package build failed");
                }
                (package.name.clone(), result)
            })
            .collect()
    }
}

/// Every planned bundle has exactly one archive and nothing else was built.
fn check_archive_contract(plan: &BundlePlan, archives: &BTreeMap<String, Vec<u8>>) -> Result<(), BuildError> {
    let planned = plan.bundle_names();
    let missing: Vec<String> = planned
        .iter()
        .filter(|name| !archives.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    let unexpected: Vec<String> = archives
        .keys()
        .filter(|name| !planned.contains(name.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(BuildError::ArchiveContract {
            package: plan.package.clone(),
            missing,
            unexpected,
        })
    }
}

/// Remove and recreate a directory so stale bundles never survive a build.
fn reset_dir(dir: &Path) -> Result<(), BuildError> {
    if dir.exists() {
        debug!(dir = %dir.display(), "clearing previous output");
        std::fs::remove_dir_all(dir).map_err(|source| BuildError::Output {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::create_dir_all(dir).map_err(|source| BuildError::Output {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BundlePlanEntry;

    fn plan(names: &[&str]) -> BundlePlan {
        BundlePlan {
            package: "p".to_string(),
            entries: names
                .iter()
                .map(|n| BundlePlanEntry::new(*n, format!("Assets/{n}").into(), BundleKind::Primary))
                .collect(),
            inlined: BTreeMap::new(),
            shared_dependencies: BTreeMap::new(),
            plan_hash: String::new(),
        }
    }

    #[test]
    fn test_contract_accepts_exact_match() {
        let archives = BTreeMap::from([("a".to_string(), vec![1]), ("b".to_string(), vec![2])]);
        assert!(check_archive_contract(&plan(&["a", "b"]), &archives).is_ok());
    }

    #[test]
    fn test_contract_reports_missing_and_unexpected() {
        let archives = BTreeMap::from([("a".to_string(), vec![1]), ("c".to_string(), vec![3])]);
        let err = check_archive_contract(&plan(&["a", "b"]), &archives).unwrap_err();
        match err {
            BuildError::ArchiveContract { missing, unexpected, .. } => {
                assert_eq!(missing, vec!["b".to_string()]);
                assert_eq!(unexpected, vec!["c".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_session_timestamp_format() {
        let session = BuildSession::new("p", "test");
        let ts = session.timestamp();
        assert_eq!(ts.len(), 19);
        assert!(!ts.contains('|'));
    }

    #[test]
    fn test_sessions_are_distinct() {
        assert_ne!(BuildSession::new("p", "t").id, BuildSession::new("p", "t").id);
    }
}
