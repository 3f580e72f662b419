//! L1: the content-addressed object store.
//!
//! Every object is identified by the SHA-1 of `"<kind> <len>\0<payload>"`
//! and persisted, zlib-compressed, at `objects/<h[0:2]>/<h[2:40]>`. Writes
//! are idempotent (content-addressing) and atomic (write-temp-then-rename,
//! see [`crate::utils::write_atomic`]).
//!
//! Parsing is split by kind: this module owns the raw header framing and
//! loose-object I/O; [`commit`] and [`tree`] own the payload grammars.
pub mod commit;
pub mod tree;

use std::{
    fmt, fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use tracing::{debug, trace};

use crate::{errors::PitError, hash::ObjectHash, utils::write_atomic};

/// The three object kinds this crate persists. Tags are lightweight refs,
/// not a fourth object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = PitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            other => Err(PitError::InvalidObjectType(other.to_string())),
        }
    }
}

/// A loose-object store rooted at `.pit/objects`.
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(pit_dir: &Path) -> Self {
        ObjectStore {
            root: pit_dir.join("objects"),
        }
    }

    fn object_path(&self, hash: ObjectHash) -> PathBuf {
        let hex = hash.to_hex();
        self.root.join(&hex[0..2]).join(&hex[2..])
    }

    /// Builds the framed payload `"<kind> <len>\0<payload>"` that is both
    /// hashed and (compressed) persisted.
    fn frame(kind: ObjectType, payload: &[u8]) -> Vec<u8> {
        let mut framed = Vec::with_capacity(payload.len() + 16);
        framed.extend_from_slice(kind.as_str().as_bytes());
        framed.push(b' ');
        framed.extend_from_slice(payload.len().to_string().as_bytes());
        framed.push(0);
        framed.extend_from_slice(payload);
        framed
    }

    /// Computes the hash of `payload` under `kind`, and when `persist` is
    /// true, zlib-compresses the framed bytes and writes them atomically
    /// unless the object already exists. Returns the hash unconditionally.
    pub fn hash_object(
        &self,
        payload: &[u8],
        kind: ObjectType,
        persist: bool,
    ) -> Result<ObjectHash, PitError> {
        let framed = Self::frame(kind, payload);
        let hash = ObjectHash::of(&framed);

        if persist {
            let path = self.object_path(hash);
            if !path.exists() {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&framed)?;
                let compressed = encoder.finish()?;
                write_atomic(&path, &compressed)?;
                trace!(hash = %hash, kind = %kind, "wrote object");
            }
        }
        Ok(hash)
    }

    /// Reads and decompresses the object at `hash`, returning its kind and
    /// raw payload (header stripped).
    pub fn read_object(&self, hash: ObjectHash) -> Result<(ObjectType, Vec<u8>), PitError> {
        let path = self.object_path(hash);
        let compressed = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PitError::ObjectMissing(hash.to_hex())
            } else {
                PitError::IOError(e)
            }
        })?;

        let mut framed = Vec::new();
        ZlibDecoder::new(&compressed[..])
            .read_to_end(&mut framed)
            .map_err(|e| PitError::CorruptObject(hash.to_hex(), e.to_string()))?;

        let null_pos = framed
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| PitError::CorruptObject(hash.to_hex(), "missing header".into()))?;
        let header = std::str::from_utf8(&framed[..null_pos])
            .map_err(|e| PitError::CorruptObject(hash.to_hex(), e.to_string()))?;
        let mut parts = header.splitn(2, ' ');
        let kind_str = parts
            .next()
            .ok_or_else(|| PitError::CorruptObject(hash.to_hex(), "missing kind".into()))?;
        let len_str = parts
            .next()
            .ok_or_else(|| PitError::CorruptObject(hash.to_hex(), "missing length".into()))?;
        let declared_len: usize = len_str
            .parse()
            .map_err(|_| PitError::CorruptObject(hash.to_hex(), "bad length".into()))?;

        let kind = ObjectType::from_str(kind_str)
            .map_err(|_| PitError::CorruptObject(hash.to_hex(), format!("bad kind {kind_str}")))?;
        let payload = framed[null_pos + 1..].to_vec();
        if payload.len() != declared_len {
            return Err(PitError::CorruptObject(
                hash.to_hex(),
                format!("length mismatch: header says {declared_len}, got {}", payload.len()),
            ));
        }
        Ok((kind, payload))
    }

    pub fn contains(&self, hash: ObjectHash) -> bool {
        self.object_path(hash).exists()
    }

    /// Resolves a 4-to-40 hex prefix to the unique matching object hash.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectHash, PitError> {
        if prefix.len() == ObjectHash::HEX_LEN {
            return ObjectHash::from_str(prefix)
                .map_err(|_| PitError::UnknownRevision(prefix.to_string()));
        }
        if prefix.len() < 2 {
            return Err(PitError::UnknownRevision(prefix.to_string()));
        }
        let (dir_name, rest) = prefix.split_at(2);
        let dir = self.root.join(dir_name);
        let mut matches = Vec::new();
        if dir.is_dir() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with(rest) {
                    let full = format!("{dir_name}{name}");
                    if let Ok(hash) = ObjectHash::from_str(&full) {
                        matches.push(hash);
                    }
                }
            }
        }
        match matches.len() {
            0 => Err(PitError::UnknownRevision(prefix.to_string())),
            1 => Ok(matches[0]),
            _ => Err(PitError::AmbiguousPrefix(prefix.to_string())),
        }
    }

    /// Like [`Self::resolve_prefix`] but restricted to commit objects,
    /// used by revision resolution.
    pub fn resolve_commit_prefix(&self, prefix: &str) -> Result<ObjectHash, PitError> {
        if prefix.len() == ObjectHash::HEX_LEN {
            let hash =
                ObjectHash::from_str(prefix).map_err(|_| PitError::UnknownRevision(prefix.to_string()))?;
            let (kind, _) = self.read_object(hash)?;
            return if kind == ObjectType::Commit {
                Ok(hash)
            } else {
                Err(PitError::UnknownRevision(prefix.to_string()))
            };
        }
        if prefix.len() < 2 {
            return Err(PitError::UnknownRevision(prefix.to_string()));
        }
        let (dir_name, rest) = prefix.split_at(2);
        let dir = self.root.join(dir_name);
        let mut matches = Vec::new();
        if dir.is_dir() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with(rest) {
                    let full = format!("{dir_name}{name}");
                    if let Ok(hash) = ObjectHash::from_str(&full) {
                        if matches!(self.read_object(hash), Ok((ObjectType::Commit, _))) {
                            matches.push(hash);
                        }
                    }
                }
            }
        }
        match matches.len() {
            0 => Err(PitError::UnknownRevision(prefix.to_string())),
            1 => Ok(matches[0]),
            _ => Err(PitError::AmbiguousPrefix(prefix.to_string())),
        }
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        debug!(root = %self.root.display(), "object store");
        write!(f, "ObjectStore({})", self.root.display())
    }
}
