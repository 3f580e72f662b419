//! `checkout`: branch switches, new-branch creation, detached revision
//! checkout, and single-file restoration.

use crate::{errors::PitError, hash::ObjectHash, internal::tree_builder::commit_files, repo::Repository};

fn require_clean(repo: &Repository) -> Result<(), PitError> {
    let head = repo.refs.head_commit()?;
    let head_files = match head {
        Some(hash) => commit_files(&repo.store, hash)?,
        None => Default::default(),
    };
    if !repo.is_clean(&head_files)? {
        return Err(PitError::DirtyWorkingTree);
    }
    Ok(())
}

/// Switches to an existing branch: requires a clean working tree, swaps
/// the working tree and index to the branch's commit, and attaches HEAD.
pub fn checkout_branch(repo: &Repository, name: &str) -> Result<(), PitError> {
    require_clean(repo)?;
    let target = repo
        .refs
        .read_branch(name)?
        .ok_or_else(|| PitError::UnknownBranch(name.to_string()))?;
    let target_files = commit_files(&repo.store, target)?;
    repo.reset_to_tree(&target_files)?;
    repo.refs.attach_head(name)?;
    Ok(())
}

/// `checkout -b <name>`: creates a new branch at HEAD and attaches to it.
/// The working tree is already at HEAD's contents, so no swap is needed.
pub fn checkout_new_branch(repo: &Repository, name: &str) -> Result<ObjectHash, PitError> {
    require_clean(repo)?;
    let head = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    repo.refs.create_branch(name, head)?;
    repo.refs.attach_head(name)?;
    Ok(head)
}

/// Checks out an arbitrary revision in detached-HEAD mode.
pub fn checkout_revision(repo: &Repository, rev: &str) -> Result<ObjectHash, PitError> {
    require_clean(repo)?;
    let target = repo.refs.resolve_revision(&repo.store, rev)?;
    let target_files = commit_files(&repo.store, target)?;
    repo.reset_to_tree(&target_files)?;
    repo.refs.detach_head(target)?;
    Ok(target)
}

/// Restores a single path from `rev` into the working tree, leaving the
/// index entirely untouched (OQ2: matches the source's file-rewrite-only
/// restore path, which never calls back into the index writer).
pub fn checkout_file(repo: &Repository, rev: &str, path: &str) -> Result<(), PitError> {
    let target = repo.refs.resolve_revision(&repo.store, rev)?;
    let target_files = commit_files(&repo.store, target)?;
    let hash = target_files
        .get(path)
        .copied()
        .ok_or_else(|| PitError::UnknownRevision(format!("{rev}:{path}")))?;

    repo.materialize_blob(path, hash)?;
    Ok(())
}
