//! # bundle-kernel
//!
//! Deterministic asset-bundle partitioning for on-demand content loading.
//!
//! The kernel answers one question:
//!
//! > Given the load points of a package, which archives must be built so that
//! > every asset is loadable and no shared asset is stored twice?
//!
//! ## Core Contract
//!
//! 1. Every entry asset owns exactly one bundle
//! 2. A dependency is promoted to its own bundle iff more than one entry asset uses it
//! 3. All shaders of a package live in one shader bundle, regardless of usage
//! 4. The version index of a package moves by exactly 1 per fully successful build
//!
//! ## Architecture
//!
//! ```text
//! Roots → Collector → DependencyGraphBuilder → classify → BundlePlanner
//!                           ↓                                  ↓
//!                   DependencyProvider                   ArchiveBuilder
//!                                                              ↓
//!                              FileLogs / DependLogs / VersionLogs (+ encrypted mirror)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same candidates + same provider answers + same config → identical `plan_hash`
//! - Bundle names are pure functions of (package, asset, naming strategy)
//! - All sets and maps are ordered (`BTreeSet`/`BTreeMap`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod provider;
pub mod collector;
pub mod graph;
pub mod classifier;
pub mod namer;
pub mod planner;
pub mod build;

// Re-exports
pub use types::{
    AssetPath, CandidateAsset, AssetRules,
    PackageConfig, ProjectConfig, BuildOptions, Compression, NamingStrategy, ConfigError,
    BundleKind, BundlePlan, BundlePlanEntry,
    BuildManifestRecord, VersionLog, ManifestParseError, VERSION_LOG_FILE,
};
pub use provider::{
    DependencyProvider, ArchiveBuilder,
    InMemoryDependencyProvider, InMemoryError,
    PackedArchiveBuilder, PackedArchiveError,
};
pub use collector::{Collector, CollectError};
pub use graph::{DependencyGraph, DependencyGraphBuilder, GraphError};
pub use classifier::{classify, Classification};
pub use namer::{bundle_name, sanitize, shader_bundle_name, SHADER_BUNDLE_PREFIX};
pub use planner::{BundlePlanner, PlanError};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use build::{
    PackageBuilder, BuildSession, BuildReport, BuildError,
    Encryptor, EncryptError, encrypt, decrypt,
    VersionWriter, ManifestError, ChecksumMismatch, verify_tree, crc32,
    LoadIndex, LogLine, LogError, parse_log, render_file_log, render_depend_log,
    FILE_LOG, DEPEND_LOG,
};
