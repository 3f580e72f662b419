//! Repository discovery and the glue between the working directory, the
//! staging index, the object store, and refs. `Repository` is the handle
//! every command in [`crate::commands`] operates through.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::info;

use crate::{
    config::{self, Config},
    errors::PitError,
    hash::ObjectHash,
    ignore::IgnoreMatcher,
    internal::{
        index::Index,
        object::{ObjectStore, ObjectType},
        refs::Refs,
    },
    utils::{remove_empty_ancestors, to_host_path, to_slash_path, write_atomic},
};

pub const PIT_DIR_NAME: &str = ".pit";
pub const DEFAULT_BRANCH: &str = "master";

/// A discovered or freshly-initialized repository: the working directory
/// root, `.pit/`, and handles onto the object store and refs.
pub struct Repository {
    pub root: PathBuf,
    pub pit_dir: PathBuf,
    pub store: ObjectStore,
    pub refs: Refs,
}

impl Repository {
    /// Walks parent directories of `start` looking for `.pit/`, implemented
    /// iteratively rather than recursively, as idiomatic Rust prefers.
    pub fn find_root(start: &Path) -> Result<PathBuf, PitError> {
        let mut current = start
            .canonicalize()
            .unwrap_or_else(|_| start.to_path_buf());
        loop {
            if current.join(PIT_DIR_NAME).is_dir() {
                return Ok(current);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Err(PitError::NotARepository),
            }
        }
    }

    /// Discovers the repository containing `start` and opens it.
    pub fn discover(start: &Path) -> Result<Repository, PitError> {
        let root = Self::find_root(start)?;
        let pit_dir = root.join(PIT_DIR_NAME);
        Ok(Repository {
            store: ObjectStore::new(&pit_dir),
            refs: Refs::new(&pit_dir),
            root,
            pit_dir,
        })
    }

    /// Initializes a fresh repository at `path`: creates `.pit/` with an
    /// empty object store, empty refs namespace, and HEAD attached to
    /// `refs/heads/master` (unborn).
    pub fn init(path: &Path) -> Result<Repository, PitError> {
        let root = path.to_path_buf();
        let pit_dir = root.join(PIT_DIR_NAME);
        fs::create_dir_all(pit_dir.join("objects"))?;
        fs::create_dir_all(pit_dir.join("refs").join("heads"))?;
        fs::create_dir_all(pit_dir.join("refs").join("tags"))?;
        fs::create_dir_all(pit_dir.join("logs"))?;
        write_atomic(
            &pit_dir.join("HEAD"),
            format!("ref: refs/heads/{DEFAULT_BRANCH}\n").as_bytes(),
        )?;
        info!(root = %root.display(), "initialized repository");
        Ok(Repository {
            store: ObjectStore::new(&pit_dir),
            refs: Refs::new(&pit_dir),
            root,
            pit_dir,
        })
    }

    pub fn index_path(&self) -> PathBuf {
        self.pit_dir.join("index")
    }

    pub fn config_path(&self) -> PathBuf {
        self.pit_dir.join("config")
    }

    pub fn merge_head_path(&self) -> PathBuf {
        self.pit_dir.join("MERGE_HEAD")
    }

    pub fn rebase_dir(&self) -> PathBuf {
        self.pit_dir.join("rebase-apply")
    }

    pub fn stash_log_path(&self) -> PathBuf {
        self.pit_dir.join("logs").join("stash")
    }

    pub fn load_index(&self) -> Result<Index, PitError> {
        Index::read(&self.index_path())
    }

    pub fn save_index(&self, index: &Index) -> Result<(), PitError> {
        index.write(&self.index_path())
    }

    pub fn load_config(&self) -> Result<Config, PitError> {
        config::load_layered(&self.pit_dir)
    }

    /// Returns `(name, email)` from config, or [`PitError::NoIdentity`] if
    /// either is missing — a precondition for `commit`.
    pub fn identity(&self) -> Result<(String, String), PitError> {
        let config = self.load_config()?;
        match (config.user_name(), config.user_email()) {
            (Some(name), Some(email)) => Ok((name.to_string(), email.to_string())),
            _ => Err(PitError::NoIdentity),
        }
    }

    pub fn ignore_matcher(&self) -> Result<IgnoreMatcher, PitError> {
        IgnoreMatcher::load(&self.root)
    }

    /// Reads a tracked file from the working directory, hashes it as a
    /// blob (optionally persisting), and returns the hash plus a stat
    /// cache `(mtime_ns, size)` for the index.
    pub fn hash_file(&self, slash_path: &str, persist: bool) -> Result<(ObjectHash, i128, u64), PitError> {
        let host_path = to_host_path(&self.root, slash_path);
        let content = fs::read(&host_path)?;
        let metadata = fs::metadata(&host_path)?;
        let mtime_ns = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i128)
            .unwrap_or(0);
        let size = metadata.len();
        let hash = self.store.hash_object(&content, ObjectType::Blob, persist)?;
        Ok((hash, mtime_ns, size))
    }

    /// Writes a blob's content to a path in the working directory,
    /// creating parent directories as needed.
    pub fn materialize_blob(&self, slash_path: &str, hash: ObjectHash) -> Result<(), PitError> {
        let host_path = to_host_path(&self.root, slash_path);
        if let Some(parent) = host_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let (_, payload) = self.store.read_object(hash)?;
        fs::write(&host_path, payload)?;
        Ok(())
    }

    /// Deletes a tracked file from the working directory and prunes empty
    /// ancestor directories up to (not including) the repository root.
    pub fn remove_working_file(&self, slash_path: &str) -> Result<(), PitError> {
        let host_path = to_host_path(&self.root, slash_path);
        if host_path.exists() {
            fs::remove_file(&host_path)?;
        }
        remove_empty_ancestors(&host_path, &self.root);
        Ok(())
    }

    /// Given the current and target `path -> hash` maps, materializes
    /// every added/changed path from `target` and removes every path in
    /// `current` that is absent from `target`.
    pub fn swap_working_tree(
        &self,
        current: &BTreeMap<String, ObjectHash>,
        target: &BTreeMap<String, ObjectHash>,
    ) -> Result<(), PitError> {
        for (path, hash) in target {
            if current.get(path) != Some(hash) {
                self.materialize_blob(path, *hash)?;
            }
        }
        for path in current.keys() {
            if !target.contains_key(path) {
                self.remove_working_file(path)?;
            }
        }
        Ok(())
    }

    /// Replaces the index and working directory to match `target`
    /// wholesale (used by checkout, reset --hard equivalents, rebase,
    /// stash).
    pub fn reset_to_tree(&self, target: &BTreeMap<String, ObjectHash>) -> Result<(), PitError> {
        let current_index = self.load_index()?;
        let current_map = current_index.to_hash_map();
        self.swap_working_tree(&current_map, target)?;
        self.save_index(&Index::from_hash_map(target.clone()))?;
        Ok(())
    }

    /// The clean-tree predicate: HEAD's tree equals the index, and
    /// every indexed path's on-disk hash matches the indexed hash and
    /// exists. Untracked files never count as dirty.
    pub fn is_clean(&self, head_files: &BTreeMap<String, ObjectHash>) -> Result<bool, PitError> {
        let index = self.load_index()?;
        let index_map = index.to_hash_map();
        if index_map != *head_files {
            return Ok(false);
        }
        for (path, expected_hash) in &index_map {
            let host_path = to_host_path(&self.root, path);
            if !host_path.exists() {
                return Ok(false);
            }
            let content = fs::read(&host_path)?;
            let actual = self.store.hash_object(&content, ObjectType::Blob, false)?;
            if actual != *expected_hash {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Lists working-tree files under the repository root as repo-relative
    /// slash paths, skipping `.pit` itself.
    pub fn walk_working_tree(&self) -> Result<Vec<String>, PitError> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.file_name() != PIT_DIR_NAME)
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path());
                out.push(to_slash_path(relative));
            }
        }
        out.sort();
        Ok(out)
    }
}
