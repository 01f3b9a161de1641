//! Host capabilities the kernel delegates to.
//!
//! The graph classification logic never talks to a content-authoring host
//! directly. It sees the host through two narrow traits: one that resolves
//! dependency closures, and one that serializes a bundle plan into archives.

pub mod memory;
pub mod packed;

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AssetPath, BuildOptions, BundlePlan};

/// Resolves the dependencies of an asset.
///
/// Implementations must return the full transitive closure. Including the
/// asset itself is allowed; the graph builder drops self edges.
pub trait DependencyProvider {
    /// Error type for provider operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Transitive dependency closure of `asset`.
    fn dependencies(&self, asset: &AssetPath) -> Result<BTreeSet<AssetPath>, Self::Error>;
}

/// Serializes a bundle plan into archive bytes.
///
/// ## Contract
///
/// - The returned map has exactly one entry per bundle name in the plan,
///   keyed by bundle name (without suffix).
/// - Each archive holds the bundle's planned members **and** the dependencies
///   listed for it in [`BundlePlan::inlined`]. Dependencies used by a single
///   entry asset are never given a bundle of their own, so an archive builder
///   that skips them drops content.
///
/// The packager rejects missing or unexpected archives.
pub trait ArchiveBuilder {
    /// Error type for archive building.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build one archive per planned bundle.
    fn build_archives(
        &self,
        plan: &BundlePlan,
        options: &BuildOptions,
        target_platform: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, Self::Error>;
}

impl<T: DependencyProvider + ?Sized> DependencyProvider for &T {
    type Error = T::Error;

    fn dependencies(&self, asset: &AssetPath) -> Result<BTreeSet<AssetPath>, Self::Error> {
        (**self).dependencies(asset)
    }
}

impl<T: ArchiveBuilder + ?Sized> ArchiveBuilder for &T {
    type Error = T::Error;

    fn build_archives(
        &self,
        plan: &BundlePlan,
        options: &BuildOptions,
        target_platform: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, Self::Error> {
        (**self).build_archives(plan, options, target_platform)
    }
}

pub use memory::{InMemoryDependencyProvider, InMemoryError};
pub use packed::{unpack, PackedArchiveBuilder, PackedArchiveError, PACKED_MAGIC};
