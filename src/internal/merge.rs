//! L6: the three-way merge engine.
//!
//! Operates at whole-blob granularity — a path is either taken wholesale from
//! one side or marked conflicted; there is no line-level text merge.
//! Kept as a standalone library component so merge, rebase, and
//! cherry-pick commands all drive the same engine instead of each
//! re-implementing the base/ours/theirs comparison.

use std::collections::{BTreeMap, BTreeSet};

use crate::{errors::PitError, hash::ObjectHash, internal::object::ObjectStore};

pub const OURS_LABEL: &str = "HEAD";

/// The resolved outcome for every path touched by base/ours/theirs.
#[derive(Debug, Clone)]
pub enum PathOutcome {
    /// Both sides agree (possibly both absent); nothing to do.
    Unchanged,
    /// Exactly one side changed relative to base; this is its result.
    Resolved(Option<ObjectHash>),
    /// Both sides changed differently; needs manual resolution.
    Conflict {
        ours: Option<ObjectHash>,
        theirs: Option<ObjectHash>,
    },
}

/// The full result of a three-way merge over two file maps against a base.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// The merged `path -> hash` map. Valid in full only when
    /// `conflicts` is empty; while conflicts are outstanding it holds the
    /// non-conflicting resolutions (conflicted paths are present in
    /// `conflict_content` instead, reflecting ours/theirs markers on disk).
    pub merged: BTreeMap<String, ObjectHash>,
    /// Paths left conflicted, in sorted order.
    pub conflicts: Vec<String>,
    /// For each conflicted path, the working-tree bytes to materialize
    /// (conflict markers wrapping each side's content, or a sentinel when
    /// a side doesn't have the file).
    pub conflict_content: BTreeMap<String, Vec<u8>>,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Runs the three-way merge of `ours` and `theirs` against `base` (an
/// empty map when there is no common ancestor). `theirs_label` names the
/// other side for the `>>>>>>> <path>` trailer; `ours` is always labeled
/// `HEAD`.
pub fn three_way_merge(
    store: &ObjectStore,
    base: &BTreeMap<String, ObjectHash>,
    ours: &BTreeMap<String, ObjectHash>,
    theirs: &BTreeMap<String, ObjectHash>,
) -> Result<MergeOutcome, PitError> {
    let mut paths: BTreeSet<&String> = BTreeSet::new();
    paths.extend(base.keys());
    paths.extend(ours.keys());
    paths.extend(theirs.keys());

    let mut outcome = MergeOutcome::default();

    for path in paths {
        let b = base.get(path).copied();
        let o = ours.get(path).copied();
        let t = theirs.get(path).copied();

        let resolution = if o == t {
            PathOutcome::Unchanged
        } else if b == o {
            PathOutcome::Resolved(t)
        } else if b == t {
            PathOutcome::Resolved(o)
        } else {
            PathOutcome::Conflict { ours: o, theirs: t }
        };

        match resolution {
            PathOutcome::Unchanged => {
                if let Some(hash) = o {
                    outcome.merged.insert(path.clone(), hash);
                }
            }
            PathOutcome::Resolved(result) => {
                if let Some(hash) = result {
                    outcome.merged.insert(path.clone(), hash);
                }
            }
            PathOutcome::Conflict { ours, theirs } => {
                outcome.conflicts.push(path.clone());
                let content = render_conflict_markers(store, path, ours, theirs)?;
                outcome.conflict_content.insert(path.clone(), content);
            }
        }
    }

    outcome.conflicts.sort();
    Ok(outcome)
}

fn side_content(store: &ObjectStore, hash: Option<ObjectHash>, side: &str) -> Result<Vec<u8>, PitError> {
    match hash {
        Some(h) => {
            let (_, payload) = store.read_object(h)?;
            Ok(payload)
        }
        None => Ok(format!("(file does not exist in {side})").into_bytes()),
    }
}

fn render_conflict_markers(
    store: &ObjectStore,
    path: &str,
    ours: Option<ObjectHash>,
    theirs: Option<ObjectHash>,
) -> Result<Vec<u8>, PitError> {
    let ours_content = side_content(store, ours, OURS_LABEL)?;
    let theirs_content = side_content(store, theirs, "theirs")?;

    let mut out = Vec::new();
    out.extend_from_slice(format!("<<<<<<< {OURS_LABEL}\n").as_bytes());
    out.extend_from_slice(&ours_content);
    if !ours_content.ends_with(b"\n") {
        out.push(b'\n');
    }
    out.extend_from_slice(b"=======\n");
    out.extend_from_slice(&theirs_content);
    if !theirs_content.ends_with(b"\n") {
        out.push(b'\n');
    }
    out.extend_from_slice(format!(">>>>>>> {path}\n").as_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::object::ObjectType;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempdir().unwrap();
        let pit = dir.path().join(".pit");
        std::fs::create_dir_all(&pit).unwrap();
        (dir, ObjectStore::new(&pit))
    }

    fn blob(store: &ObjectStore, content: &str) -> ObjectHash {
        store.hash_object(content.as_bytes(), ObjectType::Blob, true).unwrap()
    }

    #[test]
    fn both_sides_add_different_files_merge_cleanly() {
        let (_dir, store) = store();
        let base: BTreeMap<String, ObjectHash> = BTreeMap::new();
        let mut ours = BTreeMap::new();
        ours.insert("b.txt".to_string(), blob(&store, "B"));
        let mut theirs = BTreeMap::new();
        theirs.insert("c.txt".to_string(), blob(&store, "C"));

        let outcome = three_way_merge(&store, &base, &ours, &theirs).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.merged.len(), 2);
    }

    #[test]
    fn both_sides_change_same_file_conflicts() {
        let (_dir, store) = store();
        let mut base = BTreeMap::new();
        base.insert("f.txt".to_string(), blob(&store, "0"));
        let mut ours = BTreeMap::new();
        ours.insert("f.txt".to_string(), blob(&store, "1"));
        let mut theirs = BTreeMap::new();
        theirs.insert("f.txt".to_string(), blob(&store, "2"));

        let outcome = three_way_merge(&store, &base, &ours, &theirs).unwrap();
        assert!(!outcome.is_clean());
        assert_eq!(outcome.conflicts, vec!["f.txt".to_string()]);
        let content = String::from_utf8(outcome.conflict_content["f.txt"].clone()).unwrap();
        assert!(content.starts_with("<<<<<<< HEAD\n1\n=======\n2\n>>>>>>> f.txt\n"));
    }

    #[test]
    fn fast_forward_from_theirs_when_ours_unchanged() {
        let (_dir, store) = store();
        let mut base = BTreeMap::new();
        base.insert("f.txt".to_string(), blob(&store, "0"));
        let ours = base.clone();
        let mut theirs = BTreeMap::new();
        theirs.insert("f.txt".to_string(), blob(&store, "1"));

        let outcome = three_way_merge(&store, &base, &ours, &theirs).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.merged["f.txt"], theirs["f.txt"]);
    }

    #[test]
    fn deletion_on_theirs_side_propagates() {
        let (_dir, store) = store();
        let mut base = BTreeMap::new();
        base.insert("f.txt".to_string(), blob(&store, "0"));
        let ours = base.clone();
        let theirs: BTreeMap<String, ObjectHash> = BTreeMap::new();

        let outcome = three_way_merge(&store, &base, &ours, &theirs).unwrap();
        assert!(outcome.is_clean());
        assert!(!outcome.merged.contains_key("f.txt"));
    }

    #[test]
    fn unchanged_on_both_sides_keeps_file() {
        let (_dir, store) = store();
        let mut base = BTreeMap::new();
        base.insert("f.txt".to_string(), blob(&store, "x"));
        let ours = base.clone();
        let theirs = base.clone();

        let outcome = three_way_merge(&store, &base, &ours, &theirs).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.merged, base);
    }

    #[test]
    fn missing_on_one_side_renders_sentinel() {
        let (_dir, store) = store();
        let mut base = BTreeMap::new();
        base.insert("f.txt".to_string(), blob(&store, "0"));
        let mut ours = base.clone();
        ours.insert("f.txt".to_string(), blob(&store, "1"));
        let theirs: BTreeMap<String, ObjectHash> = BTreeMap::new();

        let outcome = three_way_merge(&store, &base, &ours, &theirs).unwrap();
        assert!(!outcome.is_clean());
        let content = String::from_utf8(outcome.conflict_content["f.txt"].clone()).unwrap();
        assert!(content.contains("(file does not exist in theirs)"));
    }
}
