//! BLAKE3 fingerprints for snapshot identity

use serde::{Deserialize, Serialize};

/// A BLAKE3 fingerprint (32 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a fingerprint from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the fingerprint as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        const HEX_CHARS: &[u8] = b"0123456789abcdef";
        let mut hex = String::with_capacity(64);
        for &byte in &self.0 {
            hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
            hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        hex
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash bytes using BLAKE3
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
    let hash = blake3::hash(data);
    Fingerprint::from_bytes(*hash.as_bytes())
}

/// Incremental hasher for building a fingerprint field by field
///
/// Strings are length-prefixed and optionals carry a presence byte, so
/// adjacent fields can never alias each other.
pub struct IncrementalHasher {
    inner: blake3::Hasher,
}

impl IncrementalHasher {
    /// Create a new incremental hasher
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Feed a length-prefixed string
    pub fn update_str(&mut self, value: &str) {
        self.inner.update(&(value.len() as u64).to_le_bytes());
        self.inner.update(value.as_bytes());
    }

    /// Feed an optional string
    pub fn update_opt(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.inner.update(&[1]);
                self.update_str(value);
            }
            None => {
                self.inner.update(&[0]);
            }
        }
    }

    /// Feed a count (used before list members)
    pub fn update_len(&mut self, len: usize) {
        self.inner.update(&(len as u64).to_le_bytes());
    }

    /// Finalize and return the fingerprint
    pub fn finalize(self) -> Fingerprint {
        let hash = self.inner.finalize();
        Fingerprint::from_bytes(*hash.as_bytes())
    }
}

impl Default for IncrementalHasher {
    fn default() -> Self {
        Self::new()
    }
}
