//! Deterministic bundle naming.
//!
//! Bundle names are pure functions of `(package, asset, strategy)`. Identical
//! inputs produce identical names in every process and on every platform, so
//! content-addressed caches layered on top stay valid between builds.

use regex_lite::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::types::{AssetPath, NamingStrategy};

/// Prefix of the per-package shader bundle.
pub const SHADER_BUNDLE_PREFIX: &str = "shaders_";

/// Characters replaced by [`sanitize`].
const UNSAFE_CHARS: &str = r"[/\\. |<>\r\n]";

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(UNSAFE_CHARS).expect("valid sanitize pattern"))
}

/// Replace path separators, dots, spaces and loader log delimiters with `_`.
pub fn sanitize(path: &str) -> String {
    unsafe_chars().replace_all(path, "_").into_owned()
}

/// Bundle name of an asset.
///
/// - [`NamingStrategy::Hash`]: lowercase hex SHA-256 of `package + asset`
/// - [`NamingStrategy::SanitizedPath`]: `lowercase(package + "_" + sanitize(asset))`
///
/// ```rust
/// use bundle_kernel::{bundle_name, AssetPath, NamingStrategy};
///
/// let name = bundle_name("ui", &AssetPath::new("Assets/UI/Main Menu.prefab"), NamingStrategy::SanitizedPath);
/// assert_eq!(name, "ui_assets_ui_main_menu_prefab");
/// ```
pub fn bundle_name(package: &str, asset: &AssetPath, strategy: NamingStrategy) -> String {
    match strategy {
        NamingStrategy::Hash => {
            let mut hasher = Sha256::new();
            hasher.update(package.as_bytes());
            hasher.update(asset.as_str().as_bytes());
            hex::encode(hasher.finalize())
        }
        NamingStrategy::SanitizedPath => {
            format!("{}_{}", package, sanitize(asset.as_str())).to_lowercase()
        }
    }
}

/// Name of the single shader bundle of a package.
pub fn shader_bundle_name(package: &str) -> String {
    format!("{SHADER_BUNDLE_PREFIX}{package}").to_lowercase()
}
