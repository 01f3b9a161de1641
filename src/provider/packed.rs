//! Reference archive builder.
//!
//! Writes a minimal length-prefixed container so the pipeline can run end to
//! end without a content-authoring host:
//!
//! ```text
//! "BNDL" | u32 member_count | { u32 path_len | path | u64 data_len | data }*
//! ```
//!
//! All integers are little-endian. Members are stored uncompressed whatever
//! [`Compression`](crate::types::Compression) is requested; the option only
//! matters to production serializers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::{AssetPath, BuildOptions, BundlePlan};
use super::ArchiveBuilder;

/// Container magic.
pub const PACKED_MAGIC: &[u8; 4] = b"BNDL";

/// Error type for the packed archive builder.
#[derive(Debug, thiserror::Error)]
pub enum PackedArchiveError {
    /// Member file could not be read.
    #[error("Failed to read member {asset} at {path}: {source}")]
    ReadMember {
        /// Member asset.
        asset: AssetPath,
        /// Resolved file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A length does not fit its fixed-width header field.
    #[error("Archive field too large: {0}")]
    TooLarge(String),
    /// Container bytes do not follow the layout.
    #[error("Corrupt archive: {0}")]
    Corrupt(String),
}

/// Archive builder writing [`PACKED_MAGIC`] containers from files on disk.
#[derive(Debug, Clone)]
pub struct PackedArchiveBuilder {
    project_root: PathBuf,
}

impl PackedArchiveBuilder {
    /// Create a builder resolving asset paths against `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Project root used to resolve member paths.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn pack(&self, members: &[&AssetPath], options: &BuildOptions) -> Result<Vec<u8>, PackedArchiveError> {
        let mut loaded: Vec<(&AssetPath, Vec<u8>)> = Vec::with_capacity(members.len());
        for &asset in members {
            let path = self.project_root.join(asset.as_str());
            match std::fs::read(&path) {
                Ok(bytes) => loaded.push((asset, bytes)),
                Err(source) if options.strict => {
                    return Err(PackedArchiveError::ReadMember {
                        asset: asset.clone(),
                        path,
                        source,
                    });
                }
                Err(e) => {
                    warn!(asset = %asset, error = %e, "skipping unreadable member");
                }
            }
        }

        let count = u32::try_from(loaded.len())
            .map_err(|_| PackedArchiveError::TooLarge(format!("{} members", loaded.len())))?;

        let mut out = Vec::new();
        out.extend_from_slice(PACKED_MAGIC);
        out.extend_from_slice(&count.to_le_bytes());
        for (asset, bytes) in loaded {
            let name = asset.as_str().as_bytes();
            let name_len = u32::try_from(name.len())
                .map_err(|_| PackedArchiveError::TooLarge(format!("path of {asset}")))?;
            let data_len = u64::try_from(bytes.len())
                .map_err(|_| PackedArchiveError::TooLarge(format!("data of {asset}")))?;
            out.extend_from_slice(&name_len.to_le_bytes());
            out.extend_from_slice(name);
            out.extend_from_slice(&data_len.to_le_bytes());
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }
}

impl ArchiveBuilder for PackedArchiveBuilder {
    type Error = PackedArchiveError;

    fn build_archives(
        &self,
        plan: &BundlePlan,
        options: &BuildOptions,
        target_platform: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, Self::Error> {
        let mut archives = BTreeMap::new();
        for bundle_name in plan.bundle_names() {
            let members = plan.archive_contents(bundle_name);
            let bytes = self.pack(&members, options)?;
            debug!(
                bundle = bundle_name,
                members = members.len(),
                bytes = bytes.len(),
                target = target_platform,
                "packed archive"
            );
            archives.insert(bundle_name.to_string(), bytes);
        }
        Ok(archives)
    }
}

/// Split a packed container back into `(asset path, bytes)` members.
pub fn unpack(bytes: &[u8]) -> Result<Vec<(AssetPath, Vec<u8>)>, PackedArchiveError> {
    let mut cursor = Cursor { bytes, pos: 0 };

    if cursor.take(4)? != PACKED_MAGIC {
        return Err(PackedArchiveError::Corrupt("bad magic".to_string()));
    }
    let count = cursor.read_u32()?;

    // Each member needs at least its two length fields.
    let max_members = bytes.len().saturating_sub(cursor.pos) / 12;
    let mut members = Vec::with_capacity((count as usize).min(max_members));
    for _ in 0..count {
        let name_len = to_len(u64::from(cursor.read_u32()?))?;
        let name = std::str::from_utf8(cursor.take(name_len)?)
            .map_err(|e| PackedArchiveError::Corrupt(format!("member name: {e}")))?;
        let name = AssetPath::new(name);
        let data_len = to_len(cursor.read_u64()?)?;
        let data = cursor.take(data_len)?.to_vec();
        members.push((name, data));
    }

    if cursor.pos != bytes.len() {
        return Err(PackedArchiveError::Corrupt("trailing bytes".to_string()));
    }
    Ok(members)
}

fn to_len(len: u64) -> Result<usize, PackedArchiveError> {
    usize::try_from(len).map_err(|_| PackedArchiveError::Corrupt(format!("length {len} overflows")))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], PackedArchiveError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| PackedArchiveError::Corrupt("truncated".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, PackedArchiveError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, PackedArchiveError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }
}
