//! Version manifest writing and verification.

use std::path::{Path, PathBuf};

use crate::types::{BuildManifestRecord, ManifestParseError, VersionLog, VERSION_LOG_FILE};

/// Error type for manifest writing and verification.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Reading an archive or writing the manifest failed.
    #[error("Manifest I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// An existing manifest could not be parsed.
    #[error(transparent)]
    Parse(#[from] ManifestParseError),
}

/// CRC-32 (ISO-HDLC) of a byte buffer.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Writes `VersionLogs.txt` for one output tree.
#[derive(Debug, Clone)]
pub struct VersionWriter {
    timestamp: String,
    version_index: u64,
}

impl VersionWriter {
    /// Create a writer stamping every manifest with the same timestamp
    /// and version index.
    pub fn new(timestamp: impl Into<String>, version_index: u64) -> Self {
        Self {
            timestamp: timestamp.into(),
            version_index,
        }
    }

    /// Re-read every archive in `dir`, checksum it, and write the manifest.
    ///
    /// Records are ordered by file name. Checksums cover the bytes as they
    /// exist in this tree, so plaintext and encrypted manifests differ.
    pub fn write(
        &self,
        dir: &Path,
        archives: &[String],
        encrypted: bool,
    ) -> Result<VersionLog, ManifestError> {
        let mut names: Vec<&String> = archives.iter().collect();
        names.sort();
        names.dedup();

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let path = dir.join(name);
            let bytes = std::fs::read(&path).map_err(|source| ManifestError::Io { path, source })?;
            records.push(BuildManifestRecord {
                bundle_file_name: name.clone(),
                byte_length: bytes.len() as u64,
                crc32: crc32(&bytes),
                version_index: self.version_index,
                encrypted,
                built_at: self.timestamp.clone(),
            });
        }

        let log = VersionLog {
            timestamp: self.timestamp.clone(),
            version_index: self.version_index,
            encrypted,
            records,
        };

        let path = dir.join(VERSION_LOG_FILE);
        std::fs::write(&path, log.render()).map_err(|source| ManifestError::Io { path, source })?;
        Ok(log)
    }
}

/// A manifest record that no longer matches the file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    /// Bundle file name.
    pub bundle_file_name: String,
    /// Recorded length and CRC.
    pub expected: (u64, u32),
    /// Actual length and CRC, `None` if the file is missing.
    pub actual: Option<(u64, u32)>,
}

/// Re-read a tree and compare every file against its manifest.
///
/// Returns the parsed manifest and every mismatching record. An empty
/// mismatch list means the tree is intact.
pub fn verify_tree(dir: &Path) -> Result<(VersionLog, Vec<ChecksumMismatch>), ManifestError> {
    let path = dir.join(VERSION_LOG_FILE);
    let text = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io { path, source })?;
    let log = VersionLog::parse(&text)?;

    let mut mismatches = Vec::new();
    for record in &log.records {
        let expected = (record.byte_length, record.crc32);
        let actual = match std::fs::read(dir.join(&record.bundle_file_name)) {
            Ok(bytes) => Some((bytes.len() as u64, crc32(&bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ManifestError::Io {
                    path: dir.join(&record.bundle_file_name),
                    source,
                })
            }
        };
        if actual != Some(expected) {
            mismatches.push(ChecksumMismatch {
                bundle_file_name: record.bundle_file_name.clone(),
                expected,
                actual,
            });
        }
    }

    Ok((log, mismatches))
}
