//! L3: folds the flat staging index into nested tree objects, and unfolds
//! a commit's tree back into a flat `path -> blob hash` map.

use std::collections::BTreeMap;

use crate::{
    errors::PitError,
    hash::ObjectHash,
    internal::object::{
        ObjectStore, ObjectType,
        tree::{Tree, TreeEntry},
    },
};

/// An interior node of the nested projection of the flat index: children
/// keyed by path component, each either a blob hash (leaf) or another node.
#[derive(Debug, Default)]
struct DirNode {
    blobs: BTreeMap<String, ObjectHash>,
    dirs: BTreeMap<String, DirNode>,
}

impl DirNode {
    fn insert(&mut self, components: &[&str], hash: ObjectHash) {
        match components {
            [] => unreachable!("empty path component list"),
            [name] => {
                self.blobs.insert((*name).to_string(), hash);
            }
            [dir, rest @ ..] => {
                self.dirs
                    .entry((*dir).to_string())
                    .or_default()
                    .insert(rest, hash);
            }
        }
    }

    /// Writes this node and all descendants bottom-up, returning the hash
    /// of the tree object representing this directory.
    fn write(&self, store: &ObjectStore) -> Result<ObjectHash, PitError> {
        let mut entries = Vec::new();
        for (name, hash) in &self.blobs {
            entries.push(TreeEntry::blob(name.clone(), *hash));
        }
        for (name, child) in &self.dirs {
            let child_hash = child.write(store)?;
            entries.push(TreeEntry::tree(name.clone(), child_hash));
        }
        let tree = Tree::new(entries)?;
        let payload = tree.encode()?;
        store.hash_object(&payload, ObjectType::Tree, true)
    }
}

/// Builds a root tree object from a flat `path -> blob hash` map, writing
/// every interior tree bottom-up, and returns the root tree's hash. Two
/// maps with identical `(path, hash)` pairs always yield the same hash
///, independent of the map's iteration order, because
/// entries are grouped by directory and each directory's entries are
/// sorted by name before encoding.
pub fn build_tree(store: &ObjectStore, index: &BTreeMap<String, ObjectHash>) -> Result<ObjectHash, PitError> {
    let mut root = DirNode::default();
    for (path, hash) in index {
        let components: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if components.is_empty() {
            continue;
        }
        root.insert(&components, *hash);
    }
    if root.blobs.is_empty() && root.dirs.is_empty() {
        return Err(PitError::EmptyTreeItems(
            "cannot build a tree from an empty index".into(),
        ));
    }
    root.write(store)
}

/// Recursively reads a tree object and flattens it into a `path -> blob
/// hash` map, joining subtree paths with `/`.
pub fn flatten_tree(store: &ObjectStore, root: ObjectHash) -> Result<BTreeMap<String, ObjectHash>, PitError> {
    let mut out = BTreeMap::new();
    flatten_into(store, root, "", &mut out)?;
    Ok(out)
}

fn flatten_into(
    store: &ObjectStore,
    hash: ObjectHash,
    prefix: &str,
    out: &mut BTreeMap<String, ObjectHash>,
) -> Result<(), PitError> {
    let (kind, payload) = store.read_object(hash)?;
    if kind != ObjectType::Tree {
        return Err(PitError::InvalidTreeObject(format!(
            "expected tree object at {hash}, found {kind}"
        )));
    }
    let tree = Tree::decode(&payload)?;
    for entry in &tree.entries {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        match entry.kind {
            ObjectType::Blob => {
                out.insert(path, entry.hash);
            }
            ObjectType::Tree => {
                flatten_into(store, entry.hash, &path, out)?;
            }
            ObjectType::Commit => {
                return Err(PitError::InvalidTreeItem(format!(
                    "tree entry `{}` references a commit object",
                    entry.name
                )));
            }
        }
    }
    Ok(())
}

/// Reads a commit, then flattens its tree — the canonical comparison
/// representation used throughout the command layer.
pub fn commit_files(
    store: &ObjectStore,
    commit_hash: ObjectHash,
) -> Result<BTreeMap<String, ObjectHash>, PitError> {
    let (kind, payload) = store.read_object(commit_hash)?;
    if kind != ObjectType::Commit {
        return Err(PitError::InvalidCommitObject(format!(
            "{commit_hash} is not a commit object"
        )));
    }
    let commit = crate::internal::object::commit::Commit::decode(&payload)?;
    flatten_tree(store, commit.tree)
}
