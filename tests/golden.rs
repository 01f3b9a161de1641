//! Golden tests for the bundle kernel.
//!
//! These tests verify determinism and correctness of graph analysis and
//! bundle planning without touching the filesystem.

use std::collections::BTreeSet;

use bundle_kernel::{
    AssetPath, AssetRules, CandidateAsset, BundleKind, BundlePlan, NamingStrategy, PackageConfig,
    DependencyGraph, DependencyGraphBuilder, InMemoryDependencyProvider, BundlePlanner,
    classify, bundle_name, shader_bundle_name, render_file_log, render_depend_log,
};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn entries(paths: &[&str]) -> Vec<CandidateAsset> {
    let rules = AssetRules::default();
    paths
        .iter()
        .map(|p| CandidateAsset::classify(AssetPath::new(*p), &rules, false))
        .collect()
}

fn analyze(provider: &InMemoryDependencyProvider, candidates: &[CandidateAsset]) -> DependencyGraph {
    let rules = AssetRules::default();
    DependencyGraphBuilder::new(provider, &rules, "Assets")
        .build(candidates)
        .unwrap()
}

fn plan_for(package: &PackageConfig, graph: &DependencyGraph) -> BundlePlan {
    BundlePlanner::new(package).plan(graph, &classify(graph)).unwrap()
}

/// Entries A (deps X, Y) and B (deps Y, Z).
fn shared_scenario() -> InMemoryDependencyProvider {
    InMemoryDependencyProvider::new()
        .with_dependencies("Assets/A.prefab", ["Assets/X.png", "Assets/Y.mat"])
        .with_dependencies("Assets/B.prefab", ["Assets/Y.mat", "Assets/Z.png"])
}

// ─────────────────────────────────────────────────────────────────────────────
// SCENARIO TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_shared_dependency_scenario() {
    let provider = shared_scenario();
    let graph = analyze(&provider, &entries(&["Assets/A.prefab", "Assets/B.prefab"]));

    assert_eq!(graph.reference_count(&"Assets/X.png".into()), 1);
    assert_eq!(graph.reference_count(&"Assets/Y.mat".into()), 2);
    assert_eq!(graph.reference_count(&"Assets/Z.png".into()), 1);

    let package = PackageConfig::new("core");
    let plan = plan_for(&package, &graph);

    let name = |p: &str| bundle_name("core", &AssetPath::new(p), NamingStrategy::SanitizedPath);
    let expected: BTreeSet<String> = ["Assets/A.prefab", "Assets/B.prefab", "Assets/Y.mat"]
        .iter()
        .map(|p| name(*p))
        .collect();
    let produced: BTreeSet<String> = plan.bundle_names().into_iter().map(str::to_string).collect();
    assert_eq!(produced, expected);

    let file_log = render_file_log(&plan);
    let first_line = file_log.lines().next().unwrap();
    assert_eq!(
        first_line,
        format!("<Assets/A.prefab|{}|{}>", name("Assets/A.prefab"), name("Assets/Y.mat"))
    );
    assert_eq!(
        render_depend_log(&plan),
        format!("<Assets/Y.mat|{}>\n", name("Assets/Y.mat"))
    );
}

#[test]
fn test_shader_reachable_from_two_entries() {
    let provider = InMemoryDependencyProvider::new()
        .with_dependencies("Assets/A.prefab", ["Assets/A.mat"])
        .with_dependencies("Assets/B.prefab", ["Assets/B.mat"])
        .with_dependencies("Assets/A.mat", ["Assets/Shaders/S.shader"])
        .with_dependencies("Assets/B.mat", ["Assets/Shaders/S.shader"]);
    let graph = analyze(&provider, &entries(&["Assets/A.prefab", "Assets/B.prefab"]));

    assert_eq!(graph.shaders.len(), 1);
    assert!(!graph.reference_counts.contains_key(&AssetPath::new("Assets/Shaders/S.shader")));

    let package = PackageConfig::new("core");
    let plan = plan_for(&package, &graph);

    let shader_entries: Vec<_> = plan.entries_of(BundleKind::ShaderAggregate).collect();
    assert_eq!(shader_entries.len(), 1);
    assert_eq!(shader_entries[0].bundle_name, shader_bundle_name("core"));
    assert_eq!(shader_entries[0].asset.as_str(), "Assets/Shaders/S.shader");

    // Never inlined anywhere either
    for inlined in plan.inlined.values() {
        assert!(!inlined.contains(&AssetPath::new("Assets/Shaders/S.shader")));
    }
}

#[test]
fn test_entry_dependency_not_counted() {
    // B is both an entry and a dependency of A: it keeps its own Primary bundle
    let provider = InMemoryDependencyProvider::new()
        .with_dependencies("Assets/A.prefab", ["Assets/B.prefab", "Assets/T.png"])
        .with_dependencies("Assets/B.prefab", ["Assets/T.png"]);
    let graph = analyze(&provider, &entries(&["Assets/A.prefab", "Assets/B.prefab"]));

    assert_eq!(graph.reference_count(&"Assets/B.prefab".into()), 0);
    assert_eq!(graph.reference_count(&"Assets/T.png".into()), 2);

    let plan = plan_for(&PackageConfig::new("core"), &graph);
    assert_eq!(plan.entries_of(BundleKind::Primary).count(), 2);
    assert_eq!(plan.entries_of(BundleKind::SharedDependency).count(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// DETERMINISM TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_same_inputs_same_plan_hash_100_runs() {
    let provider = shared_scenario();
    let candidates = entries(&["Assets/A.prefab", "Assets/B.prefab"]);
    let package = PackageConfig::new("core").with_naming(NamingStrategy::Hash);

    let first = plan_for(&package, &analyze(&provider, &candidates));
    for i in 1..100 {
        let plan = plan_for(&package, &analyze(&provider, &candidates));
        assert_eq!(plan, first, "Plan must be deterministic (run {} differs from run 0)", i);
    }
}

#[test]
fn test_candidate_order_does_not_matter() {
    let provider = shared_scenario();
    let package = PackageConfig::new("core");

    let forward = plan_for(&package, &analyze(&provider, &entries(&["Assets/A.prefab", "Assets/B.prefab"])));
    let reverse = plan_for(&package, &analyze(&provider, &entries(&["Assets/B.prefab", "Assets/A.prefab"])));
    assert_eq!(forward.plan_hash, reverse.plan_hash);
}

#[test]
fn test_package_name_changes_plan_hash() {
    let provider = shared_scenario();
    let graph = analyze(&provider, &entries(&["Assets/A.prefab", "Assets/B.prefab"]));

    let one = plan_for(&PackageConfig::new("one"), &graph);
    let two = plan_for(&PackageConfig::new("two"), &graph);
    assert_ne!(one.plan_hash, two.plan_hash);
}

// ─────────────────────────────────────────────────────────────────────────────
// PROPERTY TESTS
// ─────────────────────────────────────────────────────────────────────────────

/// Random package: `entry_count` entries, each depending on a subset of a
/// shared pool of textures and shaders.
fn random_package() -> impl Strategy<Value = (usize, Vec<Vec<usize>>)> {
    (1usize..8).prop_flat_map(|entry_count| {
        (
            Just(entry_count),
            proptest::collection::vec(proptest::collection::vec(0usize..12, 0..6), entry_count),
        )
    })
}

fn pool_asset(idx: usize) -> String {
    if idx % 4 == 0 {
        format!("Assets/Shaders/s{idx}.shader")
    } else {
        format!("Assets/Textures/t{idx}.png")
    }
}

proptest! {
    #[test]
    fn prop_refcount_promotion_and_shader_isolation((entry_count, deps) in random_package()) {
        let mut provider = InMemoryDependencyProvider::new();
        let entry_paths: Vec<String> = (0..entry_count).map(|i| format!("Assets/Entries/e{i}.prefab")).collect();
        for (entry, pool) in entry_paths.iter().zip(&deps) {
            provider.add_asset(entry.as_str());
            for idx in pool {
                provider.add_dependency(entry.as_str(), pool_asset(*idx));
            }
        }

        let refs: Vec<&str> = entry_paths.iter().map(String::as_str).collect();
        let graph = analyze(&provider, &entries(&refs));
        let classification = classify(&graph);
        let plan = plan_for(&PackageConfig::new("prop"), &graph);

        // refcount(d) == |{c : d ∈ deps(c)}|
        for (dependency, count) in &graph.reference_counts {
            let users = graph.dependencies.values().filter(|d| d.contains(dependency)).count();
            prop_assert_eq!(*count, users);
            // promoted iff refcount > 1
            prop_assert_eq!(classification.is_promoted(dependency), *count > 1);
            prop_assert_eq!(plan.bundle_of(dependency).is_some(), *count > 1);
        }

        // Shaders only in the shader bundle, never counted
        let shader_bundle = shader_bundle_name("prop");
        for entry in &plan.entries {
            let is_shader = entry.asset.as_str().ends_with(".shader");
            prop_assert_eq!(is_shader, entry.kind == BundleKind::ShaderAggregate);
            prop_assert_eq!(is_shader, entry.bundle_name == shader_bundle);
        }
        for inlined in plan.inlined.values() {
            prop_assert!(inlined.iter().all(|a| !a.as_str().ends_with(".shader")));
        }
        for shader in &graph.shaders {
            prop_assert!(!graph.reference_counts.contains_key(shader));
        }

        // Every entry asset owns exactly one Primary bundle
        for entry in &entry_paths {
            let owned = plan.entries_of(BundleKind::Primary).filter(|e| e.asset.as_str() == entry).count();
            prop_assert_eq!(owned, 1);
        }
    }
}
