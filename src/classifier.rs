//! Dependency classification.
//!
//! A dependency used by more than one entry asset is promoted to its own
//! bundle so that it is loaded once. A dependency used by exactly one entry
//! asset is inlined into that asset's archive. Shaders bypass both rules and
//! always go to the package shader bundle.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::DependencyGraph;
use crate::types::AssetPath;

/// Result of classifying a dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Dependencies with reference count > 1.
    pub promoted: BTreeSet<AssetPath>,
    /// Entry asset -> its dependencies with reference count == 1.
    pub inlined: BTreeMap<AssetPath, Vec<AssetPath>>,
    /// Shader bundle members.
    pub shaders: BTreeSet<AssetPath>,
}

impl Classification {
    /// Whether a dependency gets its own bundle.
    pub fn is_promoted(&self, asset: &AssetPath) -> bool {
        self.promoted.contains(asset)
    }
}

/// Classify every counted dependency of the graph.
pub fn classify(graph: &DependencyGraph) -> Classification {
    let promoted: BTreeSet<AssetPath> = graph
        .reference_counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(asset, _)| asset.clone())
        .collect();

    let mut inlined = BTreeMap::new();
    for (entry, dependencies) in &graph.dependencies {
        let sole: Vec<AssetPath> = dependencies
            .iter()
            .filter(|d| !promoted.contains(*d))
            .cloned()
            .collect();
        if !sole.is_empty() {
            inlined.insert(entry.clone(), sole);
        }
    }

    Classification {
        promoted,
        inlined,
        shaders: graph.shaders.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> DependencyGraph {
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
    fn test_promotion_iff_shared() {
        let classification = classify(&graph());

        assert!(classification.is_promoted(&"Assets/Y.mat".into()));
        assert!(!classification.is_promoted(&"Assets/X.png".into()));
        assert!(!classification.is_promoted(&"Assets/Z.png".into()));
        assert_eq!(classification.promoted.len(), 1);
    }

    #[test]
    fn test_inlined_per_entry() {
        let classification = classify(&graph());

        assert_eq!(
            classification.inlined[&AssetPath::new("Assets/A.prefab")],
            vec![AssetPath::new("Assets/X.png")]
        );
        assert_eq!(
            classification.inlined[&AssetPath::new("Assets/B.prefab")],
            vec![AssetPath::new("Assets/Z.png")]
        );
    }

    #[test]
    fn test_shaders_carried_over() {
        let classification = classify(&graph());
        assert_eq!(classification.shaders.len(), 1);
    }
}
