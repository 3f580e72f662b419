//! L2: the flat staging index, `.pit/index`.
//!
//! One line per tracked path: `"<hash> <mtime_ns> <size> <path>\n"`. The
//! `mtime_ns`/`size` pair is a stat cache used by callers to skip
//! re-hashing unchanged files; it is never authoritative for identity.
//! A legacy two-field form `"<hash> <path>"` is accepted on read
//! (mtime/size default to 0) but never emitted.

use std::{
    collections::BTreeMap,
    fs,
    path::Path,
};

use crate::{errors::PitError, hash::ObjectHash, utils::write_atomic};

/// A single staged path: its blob hash and a best-effort stat cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub hash: ObjectHash,
    pub mtime_ns: i128,
    pub size: u64,
}

/// The staging index: an ordered map from slash-path to [`IndexEntry`].
/// Carries no directory entries; directory structure is derived on commit
/// by the tree builder.
#[derive(Debug, Clone, Default)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Index::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Upserts a path's entry.
    pub fn stage(&mut self, path: impl Into<String>, hash: ObjectHash, mtime_ns: i128, size: u64) {
        self.entries
            .insert(path.into(), IndexEntry { hash, mtime_ns, size });
    }

    /// Removes a path; a no-op if absent.
    pub fn unstage(&mut self, path: &str) {
        self.entries.remove(path);
    }

    /// Produces the canonical `path -> blob hash` map used for tree
    /// building and clean-tree comparisons.
    pub fn to_hash_map(&self) -> BTreeMap<String, ObjectHash> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.hash))
            .collect()
    }

    /// Builds an index directly from a `path -> hash` map, zeroing the stat
    /// cache (used when materializing an index from a commit's tree, e.g.
    /// checkout, reset, stash).
    pub fn from_hash_map(map: BTreeMap<String, ObjectHash>) -> Self {
        let entries = map
            .into_iter()
            .map(|(path, hash)| {
                (
                    path,
                    IndexEntry {
                        hash,
                        mtime_ns: 0,
                        size: 0,
                    },
                )
            })
            .collect();
        Index { entries }
    }

    /// Parses `.pit/index`, accepting both the current 4-field format and
    /// the legacy 2-field form (`"<hash> <path>"`, mtime/size default 0).
    pub fn read(path: &Path) -> Result<Self, PitError> {
        if !path.exists() {
            return Ok(Index::new());
        }
        let content = fs::read_to_string(path)?;
        let mut entries = BTreeMap::new();
        for line in content.lines() {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(4, ' ');
            let hash_str = parts
                .next()
                .ok_or_else(|| PitError::InvalidConfig(format!("malformed index line: {line}")))?;
            let second = parts
                .next()
                .ok_or_else(|| PitError::InvalidConfig(format!("malformed index line: {line}")))?;

            let hash: ObjectHash = hash_str
                .parse()
                .map_err(|_| PitError::InvalidConfig(format!("bad index hash: {hash_str}")))?;

            let (mtime_ns, size, file_path) = match (parts.next(), parts.next()) {
                (Some(size_str), Some(path_str)) => {
                    let mtime_ns: i128 = second.parse().map_err(|_| {
                        PitError::InvalidConfig(format!("bad index mtime: {second}"))
                    })?;
                    let size: u64 = size_str
                        .parse()
                        .map_err(|_| PitError::InvalidConfig(format!("bad index size: {size_str}")))?;
                    (mtime_ns, size, path_str.to_string())
                }
                // Legacy two-field form: "<hash> <path>".
                _ => (0, 0, second.to_string()),
            };
            entries.insert(file_path, IndexEntry { hash, mtime_ns, size });
        }
        Ok(Index { entries })
    }

    /// Serializes in path-sorted order using the current (4-field) format
    /// and writes atomically.
    pub fn write(&self, path: &Path) -> Result<(), PitError> {
        let mut out = String::new();
        for (file_path, entry) in &self.entries {
            out.push_str(&format!(
                "{} {} {} {}\n",
                entry.hash, entry.mtime_ns, entry.size, file_path
            ));
        }
        write_atomic(path, out.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stage_and_unstage_round_trip() {
        let mut index = Index::new();
        index.stage("a.txt", ObjectHash::of(b"1"), 100, 5);
        assert!(index.contains("a.txt"));
        index.unstage("a.txt");
        assert!(!index.contains("a.txt"));
    }

    #[test]
    fn unstage_missing_path_is_a_no_op() {
        let mut index = Index::new();
        index.unstage("missing.txt");
        assert!(index.is_empty());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index");
        let mut index = Index::new();
        index.stage("b.txt", ObjectHash::of(b"2"), 42, 7);
        index.stage("a.txt", ObjectHash::of(b"1"), 1, 2);
        index.write(&path).unwrap();

        let read_back = Index::read(&path).unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back.get("a.txt").unwrap().hash, ObjectHash::of(b"1"));
        assert_eq!(read_back.get("b.txt").unwrap().size, 7);
    }

    #[test]
    fn write_emits_sorted_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index");
        let mut index = Index::new();
        index.stage("z.txt", ObjectHash::of(b"1"), 0, 0);
        index.stage("a.txt", ObjectHash::of(b"2"), 0, 0);
        index.write(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].ends_with("a.txt"));
        assert!(lines[1].ends_with("z.txt"));
    }

    #[test]
    fn legacy_two_field_form_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index");
        let hash = ObjectHash::of(b"legacy");
        fs::write(&path, format!("{hash} legacy.txt\n")).unwrap();
        let index = Index::read(&path).unwrap();
        let entry = index.get("legacy.txt").unwrap();
        assert_eq!(entry.hash, hash);
        assert_eq!(entry.mtime_ns, 0);
        assert_eq!(entry.size, 0);
    }

    #[test]
    fn missing_index_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let index = Index::read(&dir.path().join("no-such-index")).unwrap();
        assert!(index.is_empty());
    }
}
