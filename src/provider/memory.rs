//! In-memory dependency provider.
//!
//! Stores direct edges and answers closure queries by depth-first traversal.
//! Used by tests and by the `bundle_builder` binary, which loads the direct
//! edge map exported by the host from a JSON file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::types::AssetPath;
use super::DependencyProvider;

/// Error type for in-memory provider.
#[derive(Debug, thiserror::Error)]
pub enum InMemoryError {
    /// Asset was never registered.
    #[error("Asset not found: {0}")]
    AssetNotFound(AssetPath),
    /// Dependency map file could not be read.
    #[error("Dependency map I/O error at {path}: {source}")]
    Io {
        /// Map file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Dependency map file is not a `{asset: [deps]}` JSON object.
    #[error("Dependency map parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory dependency provider.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order. Every asset
/// mentioned on either side of an edge is registered.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDependencyProvider {
    /// Asset -> direct dependencies.
    direct: BTreeMap<AssetPath, BTreeSet<AssetPath>>,
}

impl InMemoryDependencyProvider {
    /// Create a new empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset with no dependencies.
    pub fn add_asset(&mut self, asset: impl Into<AssetPath>) {
        self.direct.entry(asset.into()).or_default();
    }

    /// Add a direct dependency edge `asset -> dependency`.
    pub fn add_dependency(&mut self, asset: impl Into<AssetPath>, dependency: impl Into<AssetPath>) {
        let dependency = dependency.into();
        self.direct.entry(dependency.clone()).or_default();
        self.direct.entry(asset.into()).or_default().insert(dependency);
    }

    /// Builder form of [`add_dependency`](Self::add_dependency) for several edges.
    pub fn with_dependencies<I, D>(mut self, asset: &str, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<AssetPath>,
    {
        self.add_asset(asset);
        for dependency in dependencies {
            self.add_dependency(asset, dependency);
        }
        self
    }

    /// Load a `{asset: [direct deps]}` JSON map.
    pub fn from_json_file(path: &Path) -> Result<Self, InMemoryError> {
        let content = std::fs::read_to_string(path).map_err(|source| InMemoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a `{asset: [direct deps]}` JSON map.
    pub fn from_json_str(json: &str) -> Result<Self, InMemoryError> {
        let map: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut provider = Self::new();
        for (asset, dependencies) in map {
            provider.add_asset(asset.as_str());
            for dependency in dependencies {
                provider.add_dependency(asset.as_str(), dependency);
            }
        }
        Ok(provider)
    }

    /// Number of registered assets.
    pub fn num_assets(&self) -> usize {
        self.direct.len()
    }

    /// Direct dependencies of an asset.
    pub fn direct_dependencies(&self, asset: &AssetPath) -> Option<&BTreeSet<AssetPath>> {
        self.direct.get(asset)
    }
}

impl DependencyProvider for InMemoryDependencyProvider {
    type Error = InMemoryError;

    fn dependencies(&self, asset: &AssetPath) -> Result<BTreeSet<AssetPath>, Self::Error> {
        if !self.direct.contains_key(asset) {
            return Err(InMemoryError::AssetNotFound(asset.clone()));
        }

        let mut closure: BTreeSet<AssetPath> = BTreeSet::new();
        let mut stack: Vec<&AssetPath> = vec![asset];

        while let Some(current) = stack.pop() {
            if let Some(children) = self.direct.get(current) {
                for child in children {
                    // Cycles terminate here
                    if closure.insert(child.clone()) {
                        stack.push(child);
                    }
                }
            }
        }

        closure.remove(asset);
        Ok(closure)
    }
}
