//! Content digests used to deduplicate assets.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 digest of a file's bytes.
///
/// Only used as a map key to detect identical content; it carries no
/// security meaning.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Digest of an in-memory buffer.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Digest of a file's contents.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        Ok(Self::of_bytes(&data))
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First `len` lowercase hex characters (at most 64).
    #[must_use]
    pub fn short_hex(&self, len: usize) -> String {
        let mut hex = hex::encode(self.0);
        hex.truncate(len);
        hex
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short_hex(16))
    }
}
