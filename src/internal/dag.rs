//! L5: commit-DAG traversal — parent extraction, reachable sets, lowest
//! common ancestor, and topological sort for rebase replay ordering.
//!
//! Kept as a standalone library component (no command-specific state) so
//! merge, rebase, cherry-pick, and revert all share one implementation
//! instead of re-deriving ancestry per command.

use std::collections::{HashSet, VecDeque};

use crate::{
    errors::PitError,
    hash::ObjectHash,
    internal::object::{ObjectStore, ObjectType, commit::Commit},
};

fn read_commit(store: &ObjectStore, hash: ObjectHash) -> Result<Commit, PitError> {
    let (kind, payload) = store.read_object(hash)?;
    if kind != ObjectType::Commit {
        return Err(PitError::InvalidCommitObject(format!(
            "{hash} is not a commit object"
        )));
    }
    Commit::decode(&payload)
}

pub fn parents(store: &ObjectStore, hash: ObjectHash) -> Result<Vec<ObjectHash>, PitError> {
    Ok(read_commit(store, hash)?.parents)
}

/// The breadth-first closure over parents starting at `start`, including
/// `start` itself.
pub fn reachable(store: &ObjectStore, start: ObjectHash) -> Result<HashSet<ObjectHash>, PitError> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited.insert(start);
    while let Some(current) = queue.pop_front() {
        for parent in parents(store, current)? {
            if visited.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(visited)
}

/// Lowest common ancestor of `a` and `b`: simultaneous BFS from both sides,
/// returning the first node to appear in both frontiers' visited sets.
/// `lca(a, a) = a`. Returns `None` if the two histories never intersect.
pub fn lca(store: &ObjectStore, a: ObjectHash, b: ObjectHash) -> Result<Option<ObjectHash>, PitError> {
    if a == b {
        return Ok(Some(a));
    }

    let mut seen_a = HashSet::new();
    let mut seen_b = HashSet::new();
    let mut queue_a = VecDeque::from([a]);
    let mut queue_b = VecDeque::from([b]);
    seen_a.insert(a);
    seen_b.insert(b);

    if seen_b.contains(&a) {
        return Ok(Some(a));
    }
    if seen_a.contains(&b) {
        return Ok(Some(b));
    }

    while !queue_a.is_empty() || !queue_b.is_empty() {
        if let Some(current) = queue_a.pop_front() {
            for parent in parents(store, current)? {
                if seen_b.contains(&parent) {
                    return Ok(Some(parent));
                }
                if seen_a.insert(parent) {
                    queue_a.push_back(parent);
                }
            }
        }
        if let Some(current) = queue_b.pop_front() {
            for parent in parents(store, current)? {
                if seen_a.contains(&parent) {
                    return Ok(Some(parent));
                }
                if seen_b.insert(parent) {
                    queue_b.push_back(parent);
                }
            }
        }
    }
    Ok(None)
}

/// Topologically sorts a commit set via Kahn's algorithm over
/// "parent-before-child" edges restricted to the set, for rebase replay
/// ordering. Merge commits are excluded by the caller before sorting
/// — this function only orders what it is given.
pub fn topo_sort(store: &ObjectStore, commits: &HashSet<ObjectHash>) -> Result<Vec<ObjectHash>, PitError> {
    use std::collections::HashMap;

    let mut in_degree: HashMap<ObjectHash, usize> = commits.iter().map(|&c| (c, 0)).collect();
    let mut children: HashMap<ObjectHash, Vec<ObjectHash>> = HashMap::new();

    for &c in commits {
        for parent in parents(store, c)? {
            if commits.contains(&parent) {
                *in_degree.get_mut(&c).unwrap() += 1;
                children.entry(parent).or_default().push(c);
            }
        }
    }

    // Deterministic ordering for equal in-degree roots.
    let mut roots: Vec<ObjectHash> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&c, _)| c)
        .collect();
    roots.sort_by_key(|h| h.to_hex());
    let mut queue: VecDeque<ObjectHash> = roots.into();

    let mut out = Vec::with_capacity(commits.len());
    while let Some(node) = queue.pop_front() {
        out.push(node);
        if let Some(kids) = children.get(&node) {
            let mut ready = Vec::new();
            for &kid in kids {
                let deg = in_degree.get_mut(&kid).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.push(kid);
                }
            }
            ready.sort_by_key(|h| h.to_hex());
            for r in ready {
                queue.push_back(r);
            }
        }
    }
    Ok(out)
}

/// Filters a commit set down to non-merge commits (single parent or root),
/// as rebase replay requires.
pub fn filter_non_merge(
    store: &ObjectStore,
    commits: HashSet<ObjectHash>,
) -> Result<HashSet<ObjectHash>, PitError> {
    let mut out = HashSet::new();
    for c in commits {
        if !read_commit(store, c)?.is_merge() {
            out.insert(c);
        }
    }
    Ok(out)
}
