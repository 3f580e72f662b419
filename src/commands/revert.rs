//! `revert`: applies the inverse of a single commit onto HEAD by
//! three-way-merging with base and theirs swapped relative to cherry-pick.

use tracing::info;

use crate::{
    commands::identity_now,
    errors::PitError,
    hash::ObjectHash,
    internal::{
        merge::three_way_merge,
        object::{ObjectType, commit::Commit},
        tree_builder::{build_tree, commit_files},
    },
    repo::Repository,
    utils::to_host_path,
};

/// Reverts `rev` on top of HEAD: the three-way merge runs with `rev`'s own
/// tree as base and its parent's tree as "theirs", so a clean revert
/// immediately after `rev` on linear history reproduces the parent's tree
/// exactly. Fails with [`PitError::NoParentToRevert`] on a root commit.
pub fn revert(repo: &Repository, rev: &str) -> Result<ObjectHash, PitError> {
    let target = repo.refs.resolve_revision(&repo.store, rev)?;
    let (_, payload) = repo.store.read_object(target)?;
    let original = Commit::decode(&payload)?;
    let parent = original
        .first_parent()
        .ok_or_else(|| PitError::NoParentToRevert(target.to_string()))?;

    let ours_hash = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    let ours_files = commit_files(&repo.store, ours_hash)?;
    if !repo.is_clean(&ours_files)? {
        return Err(PitError::DirtyWorkingTree);
    }

    let base_files = commit_files(&repo.store, target)?;
    let theirs_files = commit_files(&repo.store, parent)?;

    let outcome = three_way_merge(&repo.store, &base_files, &ours_files, &theirs_files)?;

    let message = format!(
        "Revert \"{}\"\n\nThis reverts commit {target}.",
        original.subject()
    );

    if outcome.is_clean() {
        let tree_hash = build_tree(&repo.store, &outcome.merged)?;
        let (name, email) = repo.identity()?;
        let identity = identity_now(&name, &email);
        let revert_commit = Commit::new(tree_hash, vec![ours_hash], identity.clone(), identity, message);
        let hash = repo
            .store
            .hash_object(&revert_commit.encode(), ObjectType::Commit, true)?;
        repo.reset_to_tree(&outcome.merged)?;
        repo.refs.update_after_commit(hash)?;
        info!(commit = %target, "revert applied cleanly");
        Ok(hash)
    } else {
        for (path, hash) in &outcome.merged {
            repo.materialize_blob(path, *hash)?;
        }
        for (path, content) in &outcome.conflict_content {
            let host_path = to_host_path(&repo.root, path);
            if let Some(parent) = host_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&host_path, content)?;
        }
        info!(commit = %target, conflicts = outcome.conflicts.len(), "revert left conflicts");
        Err(PitError::MergeConflict(outcome.conflicts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::commit::commit;
    use crate::config::Config;
    use std::fs;
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
    fn revert_immediately_after_restores_parent_tree() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "f.txt", b"v1", "c1");
        let before = commit_files(&repo.store, repo.refs.head_commit().unwrap().unwrap()).unwrap();
        stage_and_commit(&dir, &repo, "f.txt", b"v2", "c2");
        let to_revert = repo.refs.head_commit().unwrap().unwrap();

        let reverted = revert(&repo, &to_revert.to_hex()).unwrap();
        let after = commit_files(&repo.store, reverted).unwrap();
        assert_eq!(after, before);
        assert_eq!(fs::read(dir.path().join("f.txt")).unwrap(), b"v1");
    }

    #[test]
    fn revert_message_references_original_subject_and_hash() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "f.txt", b"v1", "c1");
        stage_and_commit(&dir, &repo, "f.txt", b"v2", "Fix thing");
        let to_revert = repo.refs.head_commit().unwrap().unwrap();

        let reverted = revert(&repo, &to_revert.to_hex()).unwrap();
        let (_, payload) = repo.store.read_object(reverted).unwrap();
        let decoded = Commit::decode(&payload).unwrap();
        assert!(decoded.message.starts_with("Revert \"Fix thing\""));
        assert!(decoded.message.contains(&to_revert.to_hex()));
    }

    #[test]
    fn revert_of_root_commit_fails() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "f.txt", b"v1", "root");
        let root = repo.refs.head_commit().unwrap().unwrap();
        assert!(matches!(
            revert(&repo, &root.to_hex()),
            Err(PitError::NoParentToRevert(_))
        ));
    }
}
