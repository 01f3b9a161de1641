//! Version manifest types and the `VersionLogs.txt` wire format.
//!
//! ```text
//! 2026-10-18 09:12:44|12|False
//! ui_assets_ui_menu_prefab.bundle|20480|3735928559
//! ui_assets_ui_shared_atlas_png.bundle|1048576|305419896
//! ```
//!
//! The header carries the build timestamp, the package version index and the
//! encrypted flag (`True`/`False`). Every following line records one archive
//! as it exists in that output tree: file name, byte length, and the CRC-32
//! (ISO-HDLC) checksum in decimal.

use serde::{Deserialize, Serialize};

/// Manifest file name inside every output tree.
pub const VERSION_LOG_FILE: &str = "VersionLogs.txt";

/// Error type for manifest parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestParseError {
    /// Manifest has no header line.
    #[error("Manifest is empty")]
    Empty,
    /// A line does not follow the grammar.
    #[error("Malformed manifest line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

/// Build metadata for one archive in one output tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildManifestRecord {
    /// Bundle file name including suffix.
    pub bundle_file_name: String,
    /// Archive size in bytes.
    pub byte_length: u64,
    /// CRC-32 over the archive bytes in this tree.
    pub crc32: u32,
    /// Package version index of the build.
    pub version_index: u64,
    /// Whether the bytes are XOR-obfuscated.
    pub encrypted: bool,
    /// Build timestamp as written in the manifest header.
    pub built_at: String,
}

/// A parsed or to-be-written `VersionLogs.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLog {
    /// Build timestamp.
    pub timestamp: String,
    /// Package version index.
    pub version_index: u64,
    /// Whether the tree is the encrypted mirror.
    pub encrypted: bool,
    /// One record per archive, ordered by file name.
    pub records: Vec<BuildManifestRecord>,
}

impl VersionLog {
    /// Render to the wire format.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}|{}|{}\n",
            self.timestamp,
            self.version_index,
            bool_token(self.encrypted)
        );
        for record in &self.records {
            out.push_str(&format!(
                "{}|{}|{}\n",
                record.bundle_file_name, record.byte_length, record.crc32
            ));
        }
        out
    }

    /// Parse the wire format.
    pub fn parse(text: &str) -> Result<Self, ManifestParseError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.is_empty());

        let (_, header) = lines.next().ok_or(ManifestParseError::Empty)?;
        let fields: Vec<&str> = header.split('|').collect();
        if fields.len() != 3 {
            return Err(malformed(1, "header must have 3 fields"));
        }
        let timestamp = fields[0].to_string();
        let version_index = fields[1]
            .parse::<u64>()
            .map_err(|e| malformed(1, &format!("version index: {e}")))?;
        let encrypted = match fields[2] {
            "True" => true,
            "False" => false,
            other => return Err(malformed(1, &format!("encrypted flag {other:?}"))),
        };

        let mut records = Vec::new();
        for (idx, line) in lines {
            let line_no = idx + 1;
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() != 3 {
                return Err(malformed(line_no, "record must have 3 fields"));
            }
            let byte_length = fields[1]
                .parse::<u64>()
                .map_err(|e| malformed(line_no, &format!("byte length: {e}")))?;
            let crc32 = fields[2]
                .parse::<u32>()
                .map_err(|e| malformed(line_no, &format!("crc32: {e}")))?;
            records.push(BuildManifestRecord {
                bundle_file_name: fields[0].to_string(),
                byte_length,
                crc32,
                version_index,
                encrypted,
                built_at: timestamp.clone(),
            });
        }

        Ok(Self {
            timestamp,
            version_index,
            encrypted,
            records,
        })
    }
}

fn bool_token(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn malformed(line: usize, reason: &str) -> ManifestParseError {
    ManifestParseError::Malformed {
        line,
        reason: reason.to_string(),
    }
}
