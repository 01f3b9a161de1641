//! Loader-facing logs.
//!
//! Two text files tell a runtime loader which bundles to load for an asset:
//!
//! ```text
//! FileLogs.txt     <Assets/A.prefab|core_assets_a_prefab|core_assets_y_mat>
//! DependLogs.txt   <Assets/Y.mat|core_assets_y_mat>
//! ```
//!
//! Each line is wrapped in `<` `>`, fields are separated by `|`, and every
//! line ends with `\n`. The grammar is a wire contract; both files are copied
//! byte-for-byte into the encrypted mirror.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::types::{AssetPath, BundleKind, BundlePlan};

/// Entry asset log file name.
pub const FILE_LOG: &str = "FileLogs.txt";
/// Shared dependency log file name.
pub const DEPEND_LOG: &str = "DependLogs.txt";

/// Error type for log writing and parsing.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Writing a log failed.
    #[error("Failed to write log {path}: {source}")]
    Io {
        /// Log path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A line does not follow `<field|field...>`.
    #[error("Malformed log line {line}: {content:?}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Offending content.
        content: String,
    },
}

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Asset path.
    pub asset: AssetPath,
    /// Bundle owning the asset.
    pub bundle: String,
    /// Shared dependency bundles to load first. Always empty in `DependLogs.txt`.
    pub dependencies: Vec<String>,
}

fn render_line(fields: &[&str]) -> String {
    format!("<{}>\n", fields.join("|"))
}

/// Render `FileLogs.txt`: one line per entry asset.
pub fn render_file_log(plan: &BundlePlan) -> String {
    let mut out = String::new();
    for entry in plan.entries_of(BundleKind::Primary) {
        let mut fields = vec![entry.asset.as_str(), entry.bundle_name.as_str()];
        if let Some(deps) = plan.shared_dependencies.get(&entry.asset) {
            fields.extend(deps.iter().map(String::as_str));
        }
        out.push_str(&render_line(&fields));
    }
    out
}

/// Render `DependLogs.txt`: one line per shared dependency.
pub fn render_depend_log(plan: &BundlePlan) -> String {
    plan.entries_of(BundleKind::SharedDependency)
        .map(|entry| render_line(&[entry.asset.as_str(), entry.bundle_name.as_str()]))
        .collect()
}

/// Write both logs into `dir`.
pub fn write_logs(dir: &Path, plan: &BundlePlan) -> Result<(), LogError> {
    for (name, content) in [(FILE_LOG, render_file_log(plan)), (DEPEND_LOG, render_depend_log(plan))] {
        let path = dir.join(name);
        std::fs::write(&path, content).map_err(|source| LogError::Io { path, source })?;
    }
    Ok(())
}

/// Parse either log format.
pub fn parse_log(text: &str) -> Result<Vec<LogLine>, LogError> {
    let mut lines = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        if raw.is_empty() {
            continue;
        }
        let malformed = || LogError::Malformed {
            line: idx + 1,
            content: raw.to_string(),
        };
        let inner = raw
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or_else(malformed)?;

        let mut fields = inner.split('|');
        let asset = fields.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
        let bundle = fields.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
        lines.push(LogLine {
            asset: AssetPath::new(asset),
            bundle: bundle.to_string(),
            dependencies: fields.map(str::to_string).collect(),
        });
    }
    Ok(lines)
}

/// Asset → bundle lookup built from both logs, as a runtime loader sees it.
#[derive(Debug, Clone, Default)]
pub struct LoadIndex {
    bundles: BTreeMap<AssetPath, LogLine>,
}

impl LoadIndex {
    /// Build from the contents of `FileLogs.txt` and `DependLogs.txt`.
    pub fn from_logs(file_log: &str, depend_log: &str) -> Result<Self, LogError> {
        let mut bundles = BTreeMap::new();
        for line in parse_log(depend_log)?.into_iter().chain(parse_log(file_log)?) {
            bundles.insert(line.asset.clone(), line);
        }
        Ok(Self { bundles })
    }

    /// Bundles to load for an asset, dependencies first, owning bundle last.
    pub fn bundles_to_load(&self, asset: &AssetPath) -> Option<Vec<&str>> {
        self.bundles.get(asset).map(|line| {
            line.dependencies
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(line.bundle.as_str()))
                .collect()
        })
    }
}
