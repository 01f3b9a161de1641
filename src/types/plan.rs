//! Bundle plan types.
//!
//! A [`BundlePlan`] is the complete, ordered description of which bundles a
//! package produces and which assets each bundle holds. It is a pure function
//! of the dependency graph and the package configuration, and carries a
//! canonical fingerprint so two plans can be compared by hash alone.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::asset::AssetPath;

/// Why an asset owns a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BundleKind {
    /// Entry asset, requested by name at runtime.
    Primary,
    /// Dependency shared by more than one entry asset.
    SharedDependency,
    /// Member of the per-package shader bundle.
    ShaderAggregate,
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::SharedDependency => write!(f, "shared_dependency"),
            Self::ShaderAggregate => write!(f, "shader_aggregate"),
        }
    }
}

/// One (bundle, member) pair of a plan.
///
/// Ordering: kind, then asset path, then bundle name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundlePlanEntry {
    /// Bundle this asset is assigned to.
    pub bundle_name: String,
    /// Member asset.
    pub asset: AssetPath,
    /// Assignment reason.
    pub kind: BundleKind,
}

impl BundlePlanEntry {
    /// Create a new plan entry.
    pub fn new(bundle_name: impl Into<String>, asset: AssetPath, kind: BundleKind) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            asset,
            kind,
        }
    }
}

impl PartialOrd for BundlePlanEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BundlePlanEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.asset.cmp(&other.asset))
            .then_with(|| self.bundle_name.cmp(&other.bundle_name))
    }
}

/// The full bundle partitioning of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlePlan {
    /// Package name.
    pub package: String,
    /// Plan entries in canonical order.
    pub entries: Vec<BundlePlanEntry>,
    /// Bundle name → dependencies embedded into that bundle's archive
    /// because exactly one entry asset uses them.
    pub inlined: BTreeMap<String, Vec<AssetPath>>,
    /// Entry asset → bundle names of the shared dependencies it loads first.
    pub shared_dependencies: BTreeMap<AssetPath, Vec<String>>,
    /// xxh64 fingerprint of the fields above.
    pub plan_hash: String,
}

impl BundlePlan {
    /// Distinct bundle names, ordered.
    pub fn bundle_names(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.bundle_name.as_str()).collect()
    }

    /// Number of distinct bundles.
    pub fn bundle_count(&self) -> usize {
        self.bundle_names().len()
    }

    /// Whether the plan produces no bundles.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of a given kind.
    pub fn entries_of(&self, kind: BundleKind) -> impl Iterator<Item = &BundlePlanEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Bundle name owning the given asset, if the asset owns one.
    pub fn bundle_of(&self, asset: &AssetPath) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| &e.asset == asset)
            .map(|e| e.bundle_name.as_str())
    }

    /// Every asset that goes into a bundle's archive: planned members
    /// followed by inlined dependencies.
    pub fn archive_contents(&self, bundle_name: &str) -> Vec<&AssetPath> {
        let mut contents: Vec<&AssetPath> = self
            .entries
            .iter()
            .filter(|e| e.bundle_name == bundle_name)
            .map(|e| &e.asset)
            .collect();
        if let Some(inlined) = self.inlined.get(bundle_name) {
            contents.extend(inlined.iter());
        }
        contents
    }
}
