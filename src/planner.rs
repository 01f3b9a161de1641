//! Bundle planning.
//!
//! Turns a classified dependency graph into a [`BundlePlan`]:
//!
//! - one `Primary` entry per entry asset
//! - one `SharedDependency` entry per promoted dependency
//! - one `ShaderAggregate` entry per shader, all under the package shader bundle
//!
//! The plan is a pure function of `(graph, package config)`. Its
//! `plan_hash` is an xxh64 fingerprint over the canonical JSON of every
//! field, so repeated planning over the same inputs yields the same hash.

use serde::Serialize;
use std::collections::BTreeMap;

use tracing::debug;

use crate::canonical::canonical_hash_hex;
use crate::classifier::Classification;
use crate::graph::DependencyGraph;
use crate::namer::{bundle_name, shader_bundle_name};
use crate::types::{AssetPath, BundleKind, BundlePlan, BundlePlanEntry, PackageConfig};

/// Error type for planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The package produces no bundles.
    #[error("Package {0} produced an empty bundle plan")]
    EmptyPlan(String),
    /// Two assets map to one bundle name.
    #[error("Bundle name {name} is shared by {first} and {second}")]
    NameCollision {
        /// Colliding bundle name.
        name: String,
        /// First asset.
        first: AssetPath,
        /// Second asset.
        second: AssetPath,
    },
    /// An asset written to the loader logs contains a log delimiter.
    #[error("Asset path {0:?} contains a loader log delimiter (one of | < > or a line break)")]
    LogDelimiter(AssetPath),
    /// Plan could not be fingerprinted.
    #[error("Plan fingerprint failed: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Plans the bundles of one package.
pub struct BundlePlanner<'a> {
    package: &'a PackageConfig,
}

impl<'a> BundlePlanner<'a> {
    /// Create a planner for a package.
    pub fn new(package: &'a PackageConfig) -> Self {
        Self { package }
    }

    fn name_of(&self, asset: &AssetPath) -> String {
        bundle_name(&self.package.name, asset, self.package.naming)
    }

    /// Produce the bundle plan.
    pub fn plan(
        &self,
        graph: &DependencyGraph,
        classification: &Classification,
    ) -> Result<BundlePlan, PlanError> {
        let package = self.package.name.as_str();
        let mut owners: BTreeMap<String, AssetPath> = BTreeMap::new();
        let mut entries = Vec::new();

        let owned = graph
            .entries
            .iter()
            .map(|asset| (asset, BundleKind::Primary))
            .chain(
                classification
                    .promoted
                    .iter()
                    .map(|asset| (asset, BundleKind::SharedDependency)),
            );
        for (asset, kind) in owned {
            if asset.has_log_delimiter() {
                return Err(PlanError::LogDelimiter(asset.clone()));
            }
            let name = self.name_of(asset);
            claim(&mut owners, &name, asset)?;
            entries.push(BundlePlanEntry::new(name, asset.clone(), kind));
        }

        if !classification.shaders.is_empty() {
            let name = shader_bundle_name(package);
            if let (Some(first), Some(shader)) = (owners.get(&name), classification.shaders.first()) {
                return Err(PlanError::NameCollision {
                    name,
                    first: first.clone(),
                    second: shader.clone(),
                });
            }
            for shader in &classification.shaders {
                entries.push(BundlePlanEntry::new(
                    name.clone(),
                    shader.clone(),
                    BundleKind::ShaderAggregate,
                ));
            }
        }

        if entries.is_empty() {
            return Err(PlanError::EmptyPlan(package.to_string()));
        }
        entries.sort();

        let inlined: BTreeMap<String, Vec<AssetPath>> = classification
            .inlined
            .iter()
            .map(|(entry, deps)| (self.name_of(entry), deps.clone()))
            .collect();

        let shared_dependencies: BTreeMap<AssetPath, Vec<String>> = graph
            .entries
            .iter()
            .map(|entry| {
                let names: Vec<String> = graph
                    .dependencies_of(entry)
                    .filter(|d| classification.is_promoted(d))
                    .map(|d| self.name_of(d))
                    .collect();
                (entry.clone(), names)
            })
            .collect();

        let plan_hash = canonical_hash_hex(&PlanHashInput {
            package,
            entries: &entries,
            inlined: &inlined,
            shared_dependencies: &shared_dependencies,
        })?;

        let plan = BundlePlan {
            package: package.to_string(),
            entries,
            inlined,
            shared_dependencies,
            plan_hash,
        };

        debug!(
            package,
            bundles = plan.bundle_count(),
            entries = plan.entries.len(),
            plan_hash = %plan.plan_hash,
            "bundle plan computed"
        );
        Ok(plan)
    }
}

fn claim(owners: &mut BTreeMap<String, AssetPath>, name: &str, asset: &AssetPath) -> Result<(), PlanError> {
    match owners.get(name) {
        Some(first) if first != asset => Err(PlanError::NameCollision {
            name: name.to_string(),
            first: first.clone(),
            second: asset.clone(),
        }),
        Some(_) => Ok(()),
        None => {
            owners.insert(name.to_string(), asset.clone());
            Ok(())
        }
    }
}

/// Internal struct for computing plan_hash.
#[derive(Serialize)]
struct PlanHashInput<'a> {
    package: &'a str,
    entries: &'a [BundlePlanEntry],
    inlined: &'a BTreeMap<String, Vec<AssetPath>>,
    shared_dependencies: &'a BTreeMap<AssetPath, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::types::NamingStrategy;
    use std::collections::BTreeSet;

    fn scenario_graph() -> DependencyGraph {
        let a = AssetPath::new("Assets/A.prefab");
        let b = AssetPath::new("Assets/B.prefab");
        let x = AssetPath::new("Assets/X.png");
        let y = AssetPath::new("Assets/Y.mat");
        let z = AssetPath::new("Assets/Z.png");

        DependencyGraph {
            entries: BTreeSet::from([a.clone(), b.clone()]),
            scenes: BTreeSet::new(),
            dependencies: BTreeMap::from([
                (a, BTreeSet::from([x.clone(), y.clone()])),
                (b, BTreeSet::from([y.clone(), z.clone()])),
            ]),
            reference_counts: BTreeMap::from([(x, 1), (y, 2), (z, 1)]),
            shaders: BTreeSet::from([AssetPath::new("Assets/S.shader")]),
        }
    }

    #[test]
    fn test_plan_bundles() {
        let graph = scenario_graph();
        let package = PackageConfig::new("core");
        let plan = BundlePlanner::new(&package).plan(&graph, &classify(&graph)).unwrap();

        let names = plan.bundle_names();
        assert_eq!(names.len(), 4);
        assert!(names.contains("core_assets_a_prefab"));
        assert!(names.contains("core_assets_b_prefab"));
        assert!(names.contains("core_assets_y_mat"));
        assert!(names.contains("shaders_core"));

        assert_eq!(plan.entries_of(BundleKind::Primary).count(), 2);
        assert_eq!(plan.entries_of(BundleKind::SharedDependency).count(), 1);
        assert_eq!(plan.entries_of(BundleKind::ShaderAggregate).count(), 1);
    }

    #[test]
    fn test_plan_inlined_and_shared() {
        let graph = scenario_graph();
        let package = PackageConfig::new("core");
        let plan = BundlePlanner::new(&package).plan(&graph, &classify(&graph)).unwrap();

        assert_eq!(plan.inlined["core_assets_a_prefab"], vec![AssetPath::new("Assets/X.png")]);
        assert_eq!(
            plan.shared_dependencies[&AssetPath::new("Assets/A.prefab")],
            vec!["core_assets_y_mat".to_string()]
        );
    }

    #[test]
    fn test_plan_hash_deterministic() {
        let graph = scenario_graph();
        let package = PackageConfig::new("core");
        let planner = BundlePlanner::new(&package);

        let first = planner.plan(&graph, &classify(&graph)).unwrap();
        let second = planner.plan(&graph, &classify(&graph)).unwrap();
        assert_eq!(first, second);

        let hashed = PackageConfig::new("core").with_naming(NamingStrategy::Hash);
        let third = BundlePlanner::new(&hashed).plan(&graph, &classify(&graph)).unwrap();
        assert_ne!(first.plan_hash, third.plan_hash);
    }

    #[test]
    fn test_empty_plan_is_error() {
        let graph = DependencyGraph::default();
        let package = PackageConfig::new("empty");
        let err = BundlePlanner::new(&package).plan(&graph, &classify(&graph)).unwrap_err();
        assert!(matches!(err, PlanError::EmptyPlan(name) if name == "empty"));
    }

    #[test]
    fn test_no_shader_bundle_without_shaders() {
        let mut graph = scenario_graph();
        graph.shaders.clear();
        let package = PackageConfig::new("core");
        let plan = BundlePlanner::new(&package).plan(&graph, &classify(&graph)).unwrap();
        assert!(!plan.bundle_names().contains("shaders_core"));
    }

    #[test]
    fn test_sanitize_collision_detected() {
        let a = AssetPath::new("Assets/a b.prefab");
        let b = AssetPath::new("Assets/a_b.prefab");
        let graph = DependencyGraph {
            entries: BTreeSet::from([a.clone(), b.clone()]),
            dependencies: BTreeMap::from([(a, BTreeSet::new()), (b, BTreeSet::new())]),
            ..DependencyGraph::default()
        };
        let package = PackageConfig::new("core");
        let err = BundlePlanner::new(&package).plan(&graph, &classify(&graph)).unwrap_err();
        assert!(matches!(err, PlanError::NameCollision { .. }));
    }

    #[test]
    fn test_shared_dependency_with_log_delimiter_rejected() {
        let a = AssetPath::new("Assets/A.prefab");
        let b = AssetPath::new("Assets/B.prefab");
        let shared = AssetPath::new("Assets/odd>name.png");
        let graph = DependencyGraph {
            entries: BTreeSet::from([a.clone(), b.clone()]),
            dependencies: BTreeMap::from([
                (a, BTreeSet::from([shared.clone()])),
                (b, BTreeSet::from([shared.clone()])),
            ]),
            reference_counts: BTreeMap::from([(shared.clone(), 2)]),
            ..DependencyGraph::default()
        };
        let package = PackageConfig::new("core");
        let err = BundlePlanner::new(&package).plan(&graph, &classify(&graph)).unwrap_err();
        assert!(matches!(err, PlanError::LogDelimiter(asset) if asset == shared));
    }
}
