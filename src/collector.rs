//! Candidate asset collection.
//!
//! Walks the configured roots of a package and returns every loadable file as
//! a [`CandidateAsset`]. Configured scenes are folded in even when they live
//! outside the roots.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::types::{AssetPath, AssetRules, CandidateAsset, PackageConfig};
use crate::types::asset::matches_extension;

/// Error type for collection.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// A configured root or scene does not exist.
    #[error("Configured path not found: {0}")]
    NotFound(PathBuf),
    /// A directory or file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A file path is not valid UTF-8 or escapes the project root.
    #[error("Unrepresentable asset path: {0}")]
    InvalidPath(PathBuf),
}

/// Collects candidate assets for a package.
pub struct Collector<'a> {
    project_root: &'a Path,
    rules: &'a AssetRules,
}

impl<'a> Collector<'a> {
    /// Create a collector resolving roots against `project_root`.
    pub fn new(project_root: &'a Path, rules: &'a AssetRules) -> Self {
        Self { project_root, rules }
    }

    /// Collect the deduplicated, ordered candidate set of a package.
    ///
    /// An empty roots list yields an empty result. A missing or unreadable
    /// root or scene is an error; the candidate set is never silently
    /// truncated.
    pub fn collect(&self, package: &PackageConfig) -> Result<Vec<CandidateAsset>, CollectError> {
        let mut found: BTreeMap<AssetPath, bool> = BTreeMap::new();

        for root in &package.roots {
            let path = self.project_root.join(root);
            let metadata = std::fs::metadata(&path).map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    CollectError::NotFound(path.clone())
                } else {
                    CollectError::Io { path: path.clone(), source }
                }
            })?;

            let mut files = Vec::new();
            if metadata.is_dir() {
                walk(&path, &mut files)?;
            } else {
                files.push(path);
            }

            for file in files {
                let asset = self.to_asset_path(&file)?;
                if self.accepts(&asset, package) {
                    found.entry(asset).or_insert(false);
                }
            }
        }

        for scene in &package.scenes {
            let path = self.project_root.join(scene);
            if !path.is_file() {
                return Err(CollectError::NotFound(path));
            }
            let asset = AssetPath::new(scene.as_str());
            if !found.contains_key(&asset) {
                info!(package = %package.name, scene = %asset, "scene folded into candidate set");
            }
            found.insert(asset, true);
        }

        let candidates: Vec<CandidateAsset> = found
            .into_iter()
            .map(|(path, is_configured_scene)| {
                CandidateAsset::classify(path, self.rules, is_configured_scene)
            })
            .collect();

        debug!(package = %package.name, candidates = candidates.len(), "collected candidates");
        Ok(candidates)
    }

    fn accepts(&self, asset: &AssetPath, package: &PackageConfig) -> bool {
        if self.rules.is_non_loadable(asset) {
            return false;
        }
        if package.filename_blacklist.iter().any(|name| name == asset.file_name()) {
            return false;
        }
        !matches_extension(asset, &package.extension_blacklist)
    }

    fn to_asset_path(&self, file: &Path) -> Result<AssetPath, CollectError> {
        let relative = file
            .strip_prefix(self.project_root)
            .map_err(|_| CollectError::InvalidPath(file.to_path_buf()))?;

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                std::path::Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| CollectError::InvalidPath(file.to_path_buf()))?;
                    parts.push(part);
                }
                std::path::Component::CurDir => {}
                _ => return Err(CollectError::InvalidPath(file.to_path_buf())),
            }
        }
        Ok(AssetPath::new(parts.join("/")))
    }
}

/// Recursively list files under `dir` in name order.
fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CollectError> {
    let io_err = |source| CollectError::Io { path: dir.to_path_buf(), source };

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| CollectError::Io {
            path: path.clone(),
            source,
        })?;
        if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
