//! Repeating-XOR obfuscation of produced archives.
//!
//! ## Weakness
//!
//! This is obfuscation, not encryption. The transform is a fixed repeating
//! XOR with no nonce, the key is stored in plaintext in the package config,
//! and known plaintext (archive headers) reveals key bytes directly. It only
//! keeps casual tools from opening bundles. The transform is part of the
//! wire contract with the runtime loader and must stay byte-compatible.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Error type for the encryption pass.
#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    /// The configured secret is empty.
    #[error("Encryption key must not be empty")]
    EmptyKey,
    /// Reading or writing a file failed.
    #[error("Encryption I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// XOR `bytes` with `key` repeated: `bytes[i] ^= key[i % key.len()]`.
///
/// A no-op for an empty key.
pub fn xor_in_place(bytes: &mut [u8], key: &[u8]) {
    if key.is_empty() {
        return;
    }
    for (byte, k) in bytes.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}

/// Obfuscate a byte buffer.
pub fn encrypt(bytes: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    xor_in_place(&mut out, key);
    out
}

/// Reverse [`encrypt`]. The transform is its own inverse.
pub fn decrypt(bytes: &[u8], key: &[u8]) -> Vec<u8> {
    encrypt(bytes, key)
}

/// Mirrors a plaintext output tree into an obfuscated one.
#[derive(Debug, Clone)]
pub struct Encryptor {
    key: Vec<u8>,
}

impl Encryptor {
    /// Create an encryptor keyed by the UTF-8 bytes of `secret`.
    pub fn new(secret: &str) -> Result<Self, EncryptError> {
        if secret.is_empty() {
            return Err(EncryptError::EmptyKey);
        }
        Ok(Self {
            key: secret.as_bytes().to_vec(),
        })
    }

    /// Key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Transform every file in `archives` from `plain_dir` into `encrypted_dir`,
    /// and copy every file in `verbatim` unchanged.
    ///
    /// Files are re-read from `plain_dir` so the mirror always reflects what
    /// was written there. The plaintext tree is never modified.
    pub fn mirror_tree(
        &self,
        plain_dir: &Path,
        encrypted_dir: &Path,
        archives: &[String],
        verbatim: &[&str],
    ) -> Result<(), EncryptError> {
        std::fs::create_dir_all(encrypted_dir).map_err(|source| EncryptError::Io {
            path: encrypted_dir.to_path_buf(),
            source,
        })?;

        for file_name in archives {
            let source_path = plain_dir.join(file_name);
            let mut bytes = std::fs::read(&source_path).map_err(|source| EncryptError::Io {
                path: source_path.clone(),
                source,
            })?;
            xor_in_place(&mut bytes, &self.key);

            let target = encrypted_dir.join(file_name);
            std::fs::write(&target, &bytes).map_err(|source| EncryptError::Io {
                path: target.clone(),
                source,
            })?;
            debug!(file = %file_name, bytes = bytes.len(), "encrypted archive");
        }

        for file_name in verbatim {
            let source_path = plain_dir.join(file_name);
            let target = encrypted_dir.join(file_name);
            std::fs::copy(&source_path, &target).map_err(|source| EncryptError::Io {
                path: source_path.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_vector() {
        let out = encrypt(&[0x00, 0xFF, 0x10, 0x20, 0x30], b"ab");
        assert_eq!(out, vec![b'a', 0xFF ^ b'b', 0x10 ^ b'a', 0x20 ^ b'b', 0x30 ^ b'a']);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(Encryptor::new(""), Err(EncryptError::EmptyKey)));
    }

    #[test]
    fn test_utf8_key_bytes() {
        let encryptor = Encryptor::new("clé").unwrap();
        assert_eq!(encryptor.key(), "clé".as_bytes());
        assert_eq!(encryptor.key().len(), 4);
    }

    #[test]
    fn test_mirror_tree() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        let mirror = dir.path().join("mirror");
        std::fs::create_dir_all(&plain).unwrap();
        std::fs::write(plain.join("a.bundle"), b"archive bytes").unwrap();
        std::fs::write(plain.join("FileLogs.txt"), b"<a|b>\n").unwrap();

        let encryptor = Encryptor::new("secret").unwrap();
        encryptor
            .mirror_tree(&plain, &mirror, &["a.bundle".to_string()], &["FileLogs.txt"])
            .unwrap();

        let encrypted = std::fs::read(mirror.join("a.bundle")).unwrap();
        assert_ne!(encrypted, b"archive bytes");
        assert_eq!(decrypt(&encrypted, b"secret"), b"archive bytes");
        assert_eq!(std::fs::read(mirror.join("FileLogs.txt")).unwrap(), b"<a|b>\n");
        assert_eq!(std::fs::read(plain.join("a.bundle")).unwrap(), b"archive bytes");
    }

    #[test]
    fn test_mirror_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let encryptor = Encryptor::new("secret").unwrap();
        let err = encryptor
            .mirror_tree(dir.path(), &dir.path().join("out"), &["nope.bundle".to_string()], &[])
            .unwrap_err();
        assert!(matches!(err, EncryptError::Io { .. }));
    }

    proptest! {
        #[test]
        fn prop_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..2048),
                           key in proptest::collection::vec(any::<u8>(), 1..64)) {
            prop_assert_eq!(decrypt(&encrypt(&bytes, &key), &key), bytes);
        }

        #[test]
        fn prop_length_preserved(bytes in proptest::collection::vec(any::<u8>(), 0..512),
                                 key in proptest::collection::vec(any::<u8>(), 1..16)) {
            prop_assert_eq!(encrypt(&bytes, &key).len(), bytes.len());
        }
    }
}
