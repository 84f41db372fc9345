//! Content hashing for scan-cache keys and snapshot checksums.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content hash computed using XXH3.
///
/// Used to key cached scanner results and to checksum serialized registry
/// snapshots. Two inputs with the same `ContentHash` are assumed identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Incremental hasher for keys built from several independent fields.
///
/// Each field is length-prefixed before it is fed to the underlying XXH3
/// state, so `["ab", "c"]` and `["a", "bc"]` hash differently.
pub struct ContentHasher {
    state: Xxh3,
}

impl ContentHasher {
    /// Creates a fresh hasher.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Feeds one length-prefixed field into the hash.
    pub fn field(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(&(data.len() as u64).to_le_bytes());
        self.state.update(data);
        self
    }

    /// Feeds a string field into the hash.
    pub fn str_field(&mut self, s: &str) -> &mut Self {
        self.field(s.as_bytes())
    }

    /// Finishes hashing and returns the resulting [`ContentHash`].
    pub fn finish(&self) -> ContentHash {
        ContentHash(self.state.digest128().to_le_bytes())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"module top; endmodule");
        let b = ContentHash::from_bytes(b"module top; endmodule");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_bytes(b"uart");
        let b = ContentHash::from_bytes(b"spi");
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_hex() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_abbreviated() {
        let s = format!("{:?}", ContentHash::from_bytes(b"test"));
        assert!(s.starts_with("ContentHash("));
        assert!(s.ends_with(")"));
    }

    #[test]
    fn field_boundaries_matter() {
        let a = ContentHasher::new().str_field("ab").str_field("c").finish();
        let b = ContentHasher::new().str_field("a").str_field("bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn hasher_is_deterministic() {
        let a = ContentHasher::new().str_field("vppreproc").str_field("-y").finish();
        let b = ContentHasher::new().str_field("vppreproc").str_field("-y").finish();
        assert_eq!(a, b);
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::from_bytes(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
