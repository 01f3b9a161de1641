//! Package and project configuration.
//!
//! Configuration is authored out-of-band and persisted as JSON. The only
//! field the kernel writes back is [`PackageConfig::version_index`], and only
//! after a package build fully succeeds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::asset::{AssetRules, LOG_DELIMITERS};

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read or written.
    #[error("Config I/O error at {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid JSON for this schema.
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// Package name is empty.
    #[error("Package name must not be empty")]
    EmptyPackageName,
    /// Package name is not a single plain directory name.
    #[error("Invalid package name {0:?}: must be a single path component without log delimiters")]
    InvalidPackageName(String),
    /// Package name collides with the encrypted mirror folder.
    #[error("Package name {0:?} is reserved for the encrypted mirror folder")]
    ReservedPackageName(String),
    /// Encrypted mirror folder is not a single plain directory name.
    #[error("Invalid encrypted folder {0:?}: must be a single path component")]
    InvalidEncryptedFolder(String),
    /// Two packages share a name.
    #[error("Duplicate package name: {0}")]
    DuplicatePackage(String),
    /// Bundle suffix is empty.
    #[error("Package {0} has an empty bundle suffix")]
    EmptySuffix(String),
    /// Bundle suffix contains a path separator or a log delimiter.
    #[error("Package {0} has an invalid bundle suffix {1:?}")]
    InvalidSuffix(String, String),
    /// Encryption enabled without a secret.
    #[error("Package {0} enables encryption but has an empty secret")]
    EmptySecret(String),
}

/// How bundle names are derived from asset paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Lowercase hex content hash of `package + asset`.
    Hash,
    /// Lowercased `package_` + sanitized asset path.
    SanitizedPath,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        Self::SanitizedPath
    }
}

/// Archive compression requested from the archive builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Store uncompressed.
    None,
    /// Chunk-based, fast to load.
    Lz4,
    /// Whole-archive, smallest output.
    Lzma,
}

impl Default for Compression {
    fn default() -> Self {
        Self::Lz4
    }
}

/// Build options forwarded verbatim to the archive builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Compression mode.
    pub compression: Compression,
    /// Produce byte-identical archives for identical inputs.
    pub deterministic: bool,
    /// Fail the archive step on any missing member instead of skipping it.
    pub strict: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            deterministic: true,
            strict: true,
        }
    }
}

/// Configuration of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Package name. Prefixes every bundle name.
    pub name: String,
    /// Monotonic build counter, persisted across builds.
    pub version_index: u64,
    /// File suffix appended to every bundle file (e.g. `.bundle`).
    pub bundle_suffix: String,
    /// Bundle naming strategy.
    pub naming: NamingStrategy,
    /// Options passed to the archive builder.
    pub build_options: BuildOptions,
    /// Write an XOR-obfuscated mirror of the output tree.
    pub encrypt: bool,
    /// Obfuscation key. Stored in plaintext.
    pub secret: String,
    /// Root asset paths, files or directories, project-relative.
    pub roots: Vec<String>,
    /// Scene paths folded into the candidate set.
    pub scenes: Vec<String>,
    /// File names never collected.
    pub filename_blacklist: Vec<String>,
    /// Extensions never collected.
    pub extension_blacklist: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version_index: 0,
            bundle_suffix: ".bundle".to_string(),
            naming: NamingStrategy::default(),
            build_options: BuildOptions::default(),
            encrypt: false,
            secret: String::new(),
            roots: Vec::new(),
            scenes: Vec::new(),
            filename_blacklist: Vec::new(),
            extension_blacklist: Vec::new(),
        }
    }
}

impl PackageConfig {
    /// Create a package config with defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a root path.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Add a scene path.
    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scenes.push(scene.into());
        self
    }

    /// Set the naming strategy.
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Enable encryption with the given secret.
    pub fn with_encryption(mut self, secret: impl Into<String>) -> Self {
        self.encrypt = true;
        self.secret = secret.into();
        self
    }

    /// Validate this package in isolation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyPackageName);
        }
        if !is_plain_dir_name(&self.name) || self.name.contains(LOG_DELIMITERS) {
            return Err(ConfigError::InvalidPackageName(self.name.clone()));
        }
        if self.bundle_suffix.is_empty() {
            return Err(ConfigError::EmptySuffix(self.name.clone()));
        }
        if self.bundle_suffix.contains(['/', '\\']) || self.bundle_suffix.contains(LOG_DELIMITERS) {
            return Err(ConfigError::InvalidSuffix(self.name.clone(), self.bundle_suffix.clone()));
        }
        if self.encrypt && self.secret.is_empty() {
            return Err(ConfigError::EmptySecret(self.name.clone()));
        }
        Ok(())
    }

    /// Validate this package against the project output layout.
    ///
    /// The plaintext tree of a package is `output_root/<name>` and is wiped
    /// on every build, so a package may not take the encrypted folder's name.
    pub fn validate_in(&self, encrypted_folder: &str) -> Result<(), ConfigError> {
        self.validate()?;
        if self.name.eq_ignore_ascii_case(encrypted_folder) {
            return Err(ConfigError::ReservedPackageName(self.name.clone()));
        }
        Ok(())
    }
}

/// Whether `name` is exactly one normal path component on every platform.
fn is_plain_dir_name(name: &str) -> bool {
    if name.contains(['/', '\\', ':']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

/// Project-wide configuration: where content lives, where output goes,
/// and the packages to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory that asset paths are relative to.
    pub project_root: PathBuf,
    /// Dependencies outside this prefix are ignored.
    pub content_root: String,
    /// Directory receiving one subdirectory per package.
    pub output_root: PathBuf,
    /// Folder under `output_root` holding the encrypted mirror.
    pub encrypted_folder: String,
    /// Target platform identifier forwarded to the archive builder.
    pub target_platform: String,
    /// Asset classification rules.
    pub rules: AssetRules,
    /// Packages, built in order.
    pub packages: Vec<PackageConfig>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            content_root: "Assets".to_string(),
            output_root: PathBuf::from("AssetBundles"),
            encrypted_folder: "Encrypted".to_string(),
            target_platform: "standalone".to_string(),
            rules: AssetRules::default(),
            packages: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate every package and package-name uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_plain_dir_name(&self.encrypted_folder) {
            return Err(ConfigError::InvalidEncryptedFolder(self.encrypted_folder.clone()));
        }
        let mut seen = BTreeSet::new();
        for package in &self.packages {
            package.validate_in(&self.encrypted_folder)?;
            if !seen.insert(package.name.as_str()) {
                return Err(ConfigError::DuplicatePackage(package.name.clone()));
            }
        }
        Ok(())
    }

    /// Plaintext output directory of a package.
    pub fn package_output_dir(&self, package: &str) -> PathBuf {
        self.output_root.join(package)
    }

    /// Encrypted output directory of a package.
    pub fn encrypted_output_dir(&self, package: &str) -> PathBuf {
        self.output_root.join(&self.encrypted_folder).join(package)
    }
}
