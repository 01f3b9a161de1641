//! Asset types for the bundle kernel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Project-relative path of a content asset.
///
/// Separators are normalized to `/` on construction so that the same asset
/// always compares, hashes and names identically regardless of host platform.
/// Implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetPath(String);

impl AssetPath {
    /// Create a new asset path, normalizing `\` separators to `/`.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        if path.contains('\\') {
            Self(path.replace('\\', "/"))
        } else {
            Self(path)
        }
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Lowercased extension including the leading dot (e.g. `".png"`).
    ///
    /// Returns `None` for paths without an extension and for dot-files
    /// such as `.gitignore`.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(name[idx..].to_ascii_lowercase()),
        }
    }

    /// Whether this path contains a character reserved by the loader log
    /// line format (see [`LOG_DELIMITERS`]).
    pub fn has_log_delimiter(&self) -> bool {
        self.0.contains(LOG_DELIMITERS)
    }

    /// Whether this path lies under the given root prefix.
    ///
    /// `Assets` contains `Assets/a.png` but not `AssetsExtra/a.png`.
    pub fn is_under(&self, root: &str) -> bool {
        let root = root.trim_end_matches('/');
        if root.is_empty() {
            return true;
        }
        self.0.len() > root.len()
            && self.0.starts_with(root)
            && self.0.as_bytes()[root.len()] == b'/'
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An asset selected by the collector as a potential load point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateAsset {
    /// Asset path.
    pub path: AssetPath,
    /// Configured as a scene, or carries a scene extension.
    pub is_scene: bool,
    /// Carries a shader extension. Shader candidates are never entry assets.
    pub is_shader: bool,
}

impl CandidateAsset {
    /// Create a plain (non-scene, non-shader) candidate.
    pub fn new(path: impl Into<AssetPath>) -> Self {
        Self {
            path: path.into(),
            is_scene: false,
            is_shader: false,
        }
    }

    /// Classify a path against the given rules.
    pub fn classify(path: AssetPath, rules: &AssetRules, is_configured_scene: bool) -> Self {
        let is_scene = is_configured_scene || rules.is_scene(&path);
        let is_shader = rules.is_shader(&path);
        Self { path, is_scene, is_shader }
    }
}

/// Characters that delimit fields and lines of the loader logs.
pub const LOG_DELIMITERS: &[char] = &['|', '<', '>', '\n', '\r'];

/// Source code extensions. Never loadable, never a content dependency.
pub const CODE_EXTENSIONS: &[&str] = &[".cs", ".js", ".boo", ".dll"];

/// Extensions excluded by the collector regardless of package settings:
/// source code, metadata, and project descriptors.
pub const NON_LOADABLE_EXTENSIONS: &[&str] = &[
    ".cs", ".js", ".boo", ".dll",
    ".meta",
    ".asmdef", ".asmref", ".csproj", ".sln", ".rsp",
];

/// Extension-based asset classification rules.
///
/// Extensions are stored lowercase with a leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRules {
    /// Shader-type extensions.
    pub shader_extensions: Vec<String>,
    /// Scene extensions.
    pub scene_extensions: Vec<String>,
}

impl Default for AssetRules {
    fn default() -> Self {
        Self {
            shader_extensions: vec![
                ".shader".to_string(),
                ".shadervariants".to_string(),
                ".compute".to_string(),
            ],
            scene_extensions: vec![".unity".to_string()],
        }
    }
}

impl AssetRules {
    /// Whether the asset is shader-type.
    pub fn is_shader(&self, path: &AssetPath) -> bool {
        matches_extension(path, &self.shader_extensions)
    }

    /// Whether the asset is a scene by extension.
    pub fn is_scene(&self, path: &AssetPath) -> bool {
        matches_extension(path, &self.scene_extensions)
    }

    /// Whether the asset is a source/code file.
    pub fn is_code(&self, path: &AssetPath) -> bool {
        path.extension()
            .map(|ext| CODE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Whether the asset belongs to the fixed non-loadable set.
    pub fn is_non_loadable(&self, path: &AssetPath) -> bool {
        path.extension()
            .map(|ext| NON_LOADABLE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// Case-insensitive extension match. Entries may omit the leading dot.
pub(crate) fn matches_extension(path: &AssetPath, extensions: &[String]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    extensions.iter().any(|candidate| {
        let candidate = candidate.trim_start_matches('.');
        ext[1..].eq_ignore_ascii_case(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_normalization() {
        let a = AssetPath::new("Assets\\Art\\hero.png");
        let b = AssetPath::new("Assets/Art/hero.png");
        assert_eq!(a, b);
        assert_eq!(a.file_name(), "hero.png");
    }

    #[test]
    fn test_extension() {
        assert_eq!(AssetPath::new("Assets/a.PNG").extension().as_deref(), Some(".png"));
        assert_eq!(AssetPath::new("Assets/dir.v2/readme").extension(), None);
        assert_eq!(AssetPath::new("Assets/.hidden").extension(), None);
    }

    #[test]
    fn test_is_under() {
        let p = AssetPath::new("Assets/Art/a.png");
        assert!(p.is_under("Assets"));
        assert!(p.is_under("Assets/"));
        assert!(!p.is_under("Assets/Audio"));
        assert!(!AssetPath::new("AssetsExtra/a.png").is_under("Assets"));
        assert!(!AssetPath::new("Packages/x/a.png").is_under("Assets"));
    }

    #[test]
    fn test_log_delimiters() {
        assert!(!AssetPath::new("Assets/UI/Main Menu.prefab").has_log_delimiter());
        assert!(AssetPath::new("Assets/a|b.prefab").has_log_delimiter());
        assert!(AssetPath::new("Assets/<a>.png").has_log_delimiter());
        assert!(AssetPath::new("Assets/a\nb.png").has_log_delimiter());
    }

    #[test]
    fn test_rules() {
        let rules = AssetRules::default();
        assert!(rules.is_shader(&"Assets/Toon.SHADER".into()));
        assert!(rules.is_scene(&"Assets/Main.unity".into()));
        assert!(rules.is_code(&"Assets/Player.cs".into()));
        assert!(rules.is_non_loadable(&"Assets/Player.cs.meta".into()));
        assert!(!rules.is_code(&"Assets/a.png".into()));
    }

    #[test]
    fn test_extension_without_dot() {
        let exts = vec!["wav".to_string()];
        assert!(matches_extension(&"Assets/a.WAV".into(), &exts));
        assert!(!matches_extension(&"Assets/a.ogg".into(), &exts));
    }
}
