//! Dependency graph construction.
//!
//! Queries the [`DependencyProvider`] once per entry asset and filters every
//! dependency edge through a fixed chain of rules:
//!
//! 1. self edges are dropped
//! 2. source/code files are dropped
//! 3. shader-type assets go to the package shader set, never to refcounts
//! 4. assets outside the content root are dropped
//! 5. other entry candidates are dropped; they own a bundle already
//! 6. everything else is counted once per depending entry asset
//!
//! ## Determinism
//!
//! All collections are ordered (`BTreeMap`/`BTreeSet`), so two builds over
//! the same candidates and provider answers produce identical graphs.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::provider::DependencyProvider;
use crate::types::{AssetPath, AssetRules, CandidateAsset};

/// Error type for graph construction.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The dependency provider failed for an asset.
    #[error("Dependency provider failed for {asset}: {message}")]
    Provider {
        /// Asset being resolved.
        asset: AssetPath,
        /// Provider error message.
        message: String,
    },
}

impl GraphError {
    /// Create a provider error from any error type.
    pub fn from_provider<E: std::error::Error>(asset: &AssetPath, e: E) -> Self {
        Self::Provider {
            asset: asset.clone(),
            message: e.to_string(),
        }
    }
}

/// Filtered dependency graph of one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Entry assets: every non-shader candidate.
    pub entries: BTreeSet<AssetPath>,
    /// Entry assets that are scenes.
    pub scenes: BTreeSet<AssetPath>,
    /// Entry asset -> realized dependencies after filtering.
    pub dependencies: BTreeMap<AssetPath, BTreeSet<AssetPath>>,
    /// Dependency -> number of entry assets depending on it.
    pub reference_counts: BTreeMap<AssetPath, usize>,
    /// Every shader-type asset reachable in the package, plus shader candidates.
    pub shaders: BTreeSet<AssetPath>,
}

impl DependencyGraph {
    /// Reference count of a dependency (0 if never counted).
    pub fn reference_count(&self, asset: &AssetPath) -> usize {
        self.reference_counts.get(asset).copied().unwrap_or(0)
    }

    /// Realized dependencies of an entry asset.
    pub fn dependencies_of(&self, entry: &AssetPath) -> impl Iterator<Item = &AssetPath> {
        self.dependencies.get(entry).into_iter().flatten()
    }
}

/// Builds a [`DependencyGraph`] from candidates and a provider.
pub struct DependencyGraphBuilder<'a, P: DependencyProvider> {
    provider: &'a P,
    rules: &'a AssetRules,
    content_root: &'a str,
}

impl<'a, P: DependencyProvider> DependencyGraphBuilder<'a, P> {
    /// Create a new builder.
    ///
    /// # Arguments
    /// * `provider` - Resolves transitive dependency closures
    /// * `rules` - Shader and code classification
    /// * `content_root` - Dependencies outside this prefix are ignored
    pub fn new(provider: &'a P, rules: &'a AssetRules, content_root: &'a str) -> Self {
        Self { provider, rules, content_root }
    }

    /// Build the filtered graph.
    pub fn build(&self, candidates: &[CandidateAsset]) -> Result<DependencyGraph, GraphError> {
        let mut graph = DependencyGraph::default();

        for candidate in candidates {
            if candidate.is_shader {
                graph.shaders.insert(candidate.path.clone());
            } else {
                graph.entries.insert(candidate.path.clone());
                if candidate.is_scene {
                    graph.scenes.insert(candidate.path.clone());
                }
            }
        }

        for entry in &graph.entries {
            let closure = self
                .provider
                .dependencies(entry)
                .map_err(|e| GraphError::from_provider(entry, e))?;

            let mut realized = BTreeSet::new();
            for dependency in closure {
                if &dependency == entry || self.rules.is_code(&dependency) {
                    continue;
                }
                if self.rules.is_shader(&dependency) {
                    graph.shaders.insert(dependency);
                    continue;
                }
                if !dependency.is_under(self.content_root) || graph.entries.contains(&dependency) {
                    continue;
                }
                *graph.reference_counts.entry(dependency.clone()).or_insert(0) += 1;
                realized.insert(dependency);
            }

            graph.dependencies.insert(entry.clone(), realized);
        }

        debug!(
            entries = graph.entries.len(),
            counted = graph.reference_counts.len(),
            shaders = graph.shaders.len(),
            "dependency graph built"
        );
        Ok(graph)
    }
}
