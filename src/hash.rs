//! SHA-1 object hashing.
//!
//! Every object in the store is identified by a 40-character lowercase hex
//! digest of SHA-1 applied to the header-prefixed payload (see
//! [`crate::internal::object`]). This module owns only the hash value type
//! and its hex <-> bytes conversions; the header-framing logic lives with
//! the object store, which is the only caller that knows what to hash.

use std::{fmt, io, str::FromStr};

use sha1::Digest;

/// A 20-byte SHA-1 object id, displayed as 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectHash([u8; 20]);

impl ObjectHash {
    pub const HEX_LEN: usize = 40;

    /// Hash of the empty string, useful as a sentinel for "no object".
    pub fn zero() -> Self {
        ObjectHash([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Compute the SHA-1 digest of raw bytes (the caller supplies the
    /// `"<kind> <len>\0"` header already prepended).
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = sha1::Sha1::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        ObjectHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() != 20 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected 20-byte hash, got {}", bytes.len()),
            ));
        }
        let mut h = [0u8; 20];
        h.copy_from_slice(bytes);
        Ok(ObjectHash(h))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({})", self.to_hex())
    }
}

/// Parses a 40-char lowercase hex string into an `ObjectHash`.
impl FromStr for ObjectHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN {
            return Err(format!(
                "expected {}-char hex hash, got {} chars",
                Self::HEX_LEN,
                s.len()
            ));
        }
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        let mut h = [0u8; 20];
        h.copy_from_slice(&bytes);
        Ok(ObjectHash(h))
    }
}

/// True if `s` is a syntactically valid hex prefix usable for
/// [`crate::internal::object::ObjectStore::resolve_prefix`] (4 to 40 hex chars).
pub fn is_hex_prefix(s: &str) -> bool {
    (4..=ObjectHash::HEX_LEN).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}
