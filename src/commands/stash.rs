//! `stash`: shelves the working tree and index as a pair of commits (an
//! index snapshot, and a working-tree snapshot parented on both HEAD and
//! the index snapshot), so nothing about the stash needs a format of its
//! own beyond the commit/tree objects already in the store.

use std::collections::BTreeMap;
use std::fs;

use tracing::info;

use crate::{
    commands::identity_now,
    errors::PitError,
    hash::ObjectHash,
    internal::{
        index::Index,
        object::{ObjectType, commit::Commit},
        tree_builder::{build_tree, commit_files},
    },
    repo::Repository,
    utils::write_atomic,
};

/// One entry in the stash log: the workdir-snapshot commit and the
/// message it was pushed with.
#[derive(Debug, Clone)]
pub struct StashEntry {
    pub hash: ObjectHash,
    pub message: String,
}

fn read_log(repo: &Repository) -> Result<Vec<StashEntry>, PitError> {
    let path = repo.stash_log_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|l| !l.is_empty())
        .map(|line| {
            let (hash_str, message) = line
                .split_once(' ')
                .ok_or_else(|| PitError::InvalidConfig(format!("malformed stash log line: {line}")))?;
            let hash = hash_str
                .parse::<ObjectHash>()
                .map_err(|_| PitError::InvalidConfig(format!("bad stash hash: {hash_str}")))?;
            Ok(StashEntry {
                hash,
                message: message.to_string(),
            })
        })
        .collect()
}

fn write_log(repo: &Repository, entries: &[StashEntry]) -> Result<(), PitError> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{} {}\n", entry.hash, entry.message));
    }
    write_atomic(&repo.stash_log_path(), out.as_bytes())
}

/// Snapshots the on-disk state of every path already tracked (in the index
/// or in HEAD) — never the whole working tree, so untracked files never
/// enter a stash commit and can't be re-staged on pop. A tracked path
/// missing from disk is simply omitted, matching a working-tree deletion.
fn snapshot_working_tree(
    repo: &Repository,
    tracked: &BTreeMap<String, ObjectHash>,
) -> Result<BTreeMap<String, ObjectHash>, PitError> {
    let mut map = BTreeMap::new();
    for path in tracked.keys() {
        let host_path = crate::utils::to_host_path(&repo.root, path);
        if !host_path.exists() {
            continue;
        }
        let (hash, _mtime, _size) = repo.hash_file(path, true)?;
        map.insert(path.clone(), hash);
    }
    Ok(map)
}

/// Shelves the current index and working-tree state, then resets both
/// back to HEAD. Fails with [`PitError::NothingToCommit`] when there is
/// nothing to shelve.
pub fn stash_push(repo: &Repository, message: Option<&str>) -> Result<ObjectHash, PitError> {
    let head = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    let head_files = commit_files(&repo.store, head)?;

    let index = repo.load_index()?;
    let index_map = index.to_hash_map();
    let mut tracked = index_map.clone();
    tracked.extend(head_files.iter().map(|(p, h)| (p.clone(), *h)));
    let working_map = snapshot_working_tree(repo, &tracked)?;

    if index_map == head_files && working_map == head_files {
        return Err(PitError::NothingToCommit);
    }

    let (name, email) = repo.identity()?;
    let identity = identity_now(&name, &email);
    let message = message.unwrap_or("WIP").to_string();

    let index_tree = build_tree(&repo.store, &index_map)?;
    let index_commit = Commit::new(
        index_tree,
        vec![head],
        identity.clone(),
        identity.clone(),
        format!("index on stash: {message}"),
    );
    let index_hash = repo
        .store
        .hash_object(&index_commit.encode(), ObjectType::Commit, true)?;

    let workdir_tree = build_tree(&repo.store, &working_map)?;
    let workdir_commit = Commit::new(
        workdir_tree,
        vec![head, index_hash],
        identity.clone(),
        identity,
        message.clone(),
    );
    let workdir_hash = repo
        .store
        .hash_object(&workdir_commit.encode(), ObjectType::Commit, true)?;

    repo.reset_to_tree(&head_files)?;

    let mut entries = read_log(repo)?;
    entries.push(StashEntry {
        hash: workdir_hash,
        message,
    });
    write_log(repo, &entries)?;

    info!(stash = %workdir_hash, "stashed working tree");
    Ok(workdir_hash)
}

/// Lists stash entries, most recently pushed first.
pub fn stash_list(repo: &Repository) -> Result<Vec<StashEntry>, PitError> {
    let mut entries = read_log(repo)?;
    entries.reverse();
    Ok(entries)
}

/// Restores the top stash entry: the working tree from the workdir-snapshot
/// commit's own tree, and the index from that commit's second parent (the
/// index-snapshot commit). Requires a clean tree relative to HEAD, matching
/// every other history-rewriting command.
pub fn stash_pop(repo: &Repository) -> Result<(), PitError> {
    let head_hash = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    let head_files = commit_files(&repo.store, head_hash)?;
    if !repo.is_clean(&head_files)? {
        return Err(PitError::DirtyWorkingTree);
    }

    let mut entries = read_log(repo)?;
    let top = entries.last().cloned().ok_or(PitError::NothingToCommit)?;

    let (_, payload) = repo.store.read_object(top.hash)?;
    let workdir_commit = Commit::decode(&payload)?;
    let index_hash = workdir_commit
        .parents
        .get(1)
        .copied()
        .ok_or_else(|| PitError::InvalidCommitObject(format!("{} has no index parent", top.hash)))?;

    let index_files = commit_files(&repo.store, index_hash)?;
    let workdir_files = commit_files(&repo.store, top.hash)?;

    repo.swap_working_tree(&head_files, &workdir_files)?;
    repo.save_index(&Index::from_hash_map(index_files))?;

    entries.pop();
    write_log(repo, &entries)?;
    info!(stash = %top.hash, "popped stash entry");
    Ok(())
}

/// Removes every stash entry without applying them.
pub fn stash_clear(repo: &Repository) -> Result<(), PitError> {
    write_log(repo, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::commit::commit;
    use crate::config::Config;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = Config::new();
        config.set("user", "name", "pit user");
        config.set("user", "email", "pit@example.com");
        config.write(&repo.config_path()).unwrap();
        (dir, repo)
    }

    fn stage_and_commit(dir: &tempfile::TempDir, repo: &Repository, name: &str, content: &[u8], msg: &str) {
        fs::write(dir.path().join(name), content).unwrap();
        let (hash, mtime, size) = repo.hash_file(name, true).unwrap();
        let mut index = repo.load_index().unwrap();
        index.stage(name, hash, mtime, size);
        repo.save_index(&index).unwrap();
        commit(repo, msg).unwrap();
    }

    #[test]
    fn push_with_no_changes_fails() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        assert!(matches!(stash_push(&repo, None), Err(PitError::NothingToCommit)));
    }

    #[test]
    fn push_then_pop_round_trips_a_dirty_change() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        fs::write(dir.path().join("a.txt"), b"dirty").unwrap();

        stash_push(&repo, Some("wip")).unwrap();
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"1");

        stash_pop(&repo).unwrap();
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"dirty");
        assert!(stash_list(&repo).unwrap().is_empty());
    }

    #[test]
    fn list_reports_most_recent_first() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        fs::write(dir.path().join("a.txt"), b"v2").unwrap();
        stash_push(&repo, Some("first")).unwrap();
        fs::write(dir.path().join("a.txt"), b"v3").unwrap();
        stash_push(&repo, Some("second")).unwrap();

        let entries = stash_list(&repo).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "second");
        assert_eq!(entries[1].message, "first");
    }

    #[test]
    fn clear_removes_all_entries() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        fs::write(dir.path().join("a.txt"), b"v2").unwrap();
        stash_push(&repo, None).unwrap();
        stash_clear(&repo).unwrap();
        assert!(stash_list(&repo).unwrap().is_empty());
    }

    #[test]
    fn push_then_pop_restores_the_index_byte_identically() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"v1", "c1");

        fs::write(dir.path().join("a.txt"), b"v2").unwrap();
        fs::write(dir.path().join("b.txt"), b"new").unwrap();
        let (hash, mtime, size) = repo.hash_file("b.txt", true).unwrap();
        let mut index = repo.load_index().unwrap();
        index.stage("b.txt", hash, mtime, size);
        repo.save_index(&index).unwrap();

        let index_before = repo.load_index().unwrap().to_hash_map();

        stash_push(&repo, None).unwrap();
        stash_pop(&repo).unwrap();

        let index_after = repo.load_index().unwrap().to_hash_map();
        assert_eq!(index_before, index_after);
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"v2");
        assert_eq!(fs::read(dir.path().join("b.txt")).unwrap(), b"new");
    }

    #[test]
    fn pop_requires_a_clean_working_tree() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        fs::write(dir.path().join("a.txt"), b"v2").unwrap();
        stash_push(&repo, None).unwrap();

        fs::write(dir.path().join("a.txt"), b"dirty-again").unwrap();
        assert!(matches!(stash_pop(&repo), Err(PitError::DirtyWorkingTree)));
    }

    #[test]
    fn pop_with_empty_stash_fails() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        assert!(matches!(stash_pop(&repo), Err(PitError::NothingToCommit)));
    }
}
