//! `cherry-pick`: replays a single non-merge commit's diff onto HEAD,
//! reusing its original message.

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

/// Cherry-picks `rev` onto HEAD. Fails with
/// [`PitError::TooManyParents`] if `rev` is a merge commit — cherry-pick
/// only knows how to replay a single parent's diff.
pub fn cherry_pick(repo: &Repository, rev: &str) -> Result<ObjectHash, PitError> {
    let target = repo.refs.resolve_revision(&repo.store, rev)?;
    let (_, payload) = repo.store.read_object(target)?;
    let original = Commit::decode(&payload)?;
    if original.is_merge() {
        return Err(PitError::TooManyParents(target.to_string()));
    }

    let ours_hash = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    let ours_files = commit_files(&repo.store, ours_hash)?;
    if !repo.is_clean(&ours_files)? {
        return Err(PitError::DirtyWorkingTree);
    }

    let base_files = match original.first_parent() {
        Some(parent) => commit_files(&repo.store, parent)?,
        None => Default::default(),
    };
    let theirs_files = commit_files(&repo.store, target)?;

    let outcome = three_way_merge(&repo.store, &base_files, &ours_files, &theirs_files)?;

    if outcome.is_clean() {
        let tree_hash = build_tree(&repo.store, &outcome.merged)?;
        let (name, email) = repo.identity()?;
        let committer = identity_now(&name, &email);
        let replayed = Commit::new(
            tree_hash,
            vec![ours_hash],
            original.author.clone(),
            committer,
            original.message.clone(),
        );
        let hash = repo
            .store
            .hash_object(&replayed.encode(), ObjectType::Commit, true)?;
        repo.reset_to_tree(&outcome.merged)?;
        repo.refs.update_after_commit(hash)?;
        info!(commit = %target, "cherry-pick applied cleanly");
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
        info!(commit = %target, conflicts = outcome.conflicts.len(), "cherry-pick left conflicts");
        Err(PitError::MergeConflict(outcome.conflicts))
    }
}
