//! Core types for the bundle kernel.

pub mod asset;
pub mod config;
pub mod plan;
pub mod manifest;

pub use asset::{AssetPath, CandidateAsset, AssetRules, CODE_EXTENSIONS, LOG_DELIMITERS, NON_LOADABLE_EXTENSIONS};
pub use config::{
    BuildOptions, Compression, ConfigError, NamingStrategy, PackageConfig, ProjectConfig,
};
pub use plan::{BundleKind, BundlePlan, BundlePlanEntry};
pub use manifest::{BuildManifestRecord, ManifestParseError, VersionLog, VERSION_LOG_FILE};
