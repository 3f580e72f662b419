//! `merge`: three-way merges another branch into HEAD.

use std::collections::BTreeMap;

use tracing::info;

use crate::{
    commands::identity_now,
    errors::PitError,
    hash::ObjectHash,
    internal::{
        dag::lca,
        merge::three_way_merge,
        object::{ObjectType, commit::Commit},
        tree_builder::{build_tree, commit_files},
    },
    repo::Repository,
};

fn head_files(repo: &Repository) -> Result<(Option<ObjectHash>, BTreeMap<String, ObjectHash>), PitError> {
    let head = repo.refs.head_commit()?;
    let files = match head {
        Some(hash) => commit_files(&repo.store, hash)?,
        None => Default::default(),
    };
    Ok((head, files))
}

/// Merges `branch_name` into HEAD. Requires a clean working tree. On a
/// clean three-way merge, records a two-parent merge commit and returns
/// its hash. On conflicts, materializes conflict markers for conflicted
/// paths, the non-conflicting resolutions for the rest, writes
/// `MERGE_HEAD`, and returns [`PitError::MergeConflict`].
pub fn merge(repo: &Repository, branch_name: &str) -> Result<ObjectHash, PitError> {
    let (head, ours_files) = head_files(repo)?;
    let head = head.ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    if !repo.is_clean(&ours_files)? {
        return Err(PitError::DirtyWorkingTree);
    }

    let theirs = repo
        .refs
        .read_branch(branch_name)?
        .ok_or_else(|| PitError::UnknownBranch(branch_name.to_string()))?;
    let theirs_files = commit_files(&repo.store, theirs)?;

    let base_files = match lca(&repo.store, head, theirs)? {
        Some(base) => commit_files(&repo.store, base)?,
        None => Default::default(),
    };

    let outcome = three_way_merge(&repo.store, &base_files, &ours_files, &theirs_files)?;

    if outcome.is_clean() {
        let tree_hash = build_tree(&repo.store, &outcome.merged)?;
        let (name, email) = repo.identity()?;
        let identity = identity_now(&name, &email);
        let commit = Commit::new(
            tree_hash,
            vec![head, theirs],
            identity.clone(),
            identity,
            format!("Merge branch '{branch_name}'"),
        );
        let hash = repo
            .store
            .hash_object(&commit.encode(), ObjectType::Commit, true)?;
        repo.reset_to_tree(&outcome.merged)?;
        repo.refs.update_after_commit(hash)?;
        info!(branch = branch_name, commit = %hash, "merge completed cleanly");
        Ok(hash)
    } else {
        for (path, hash) in &outcome.merged {
            repo.materialize_blob(path, *hash)?;
        }
        for (path, content) in &outcome.conflict_content {
            let host_path = crate::utils::to_host_path(&repo.root, path);
            if let Some(parent) = host_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&host_path, content)?;
        }
        crate::utils::write_atomic(&repo.merge_head_path(), format!("{theirs}\n").as_bytes())?;
        info!(branch = branch_name, conflicts = outcome.conflicts.len(), "merge left conflicts");
        Err(PitError::MergeConflict(outcome.conflicts))
    }
}
