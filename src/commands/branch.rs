//! `branch` and `tag`: lightweight ref creation and listing.

use crate::{errors::PitError, hash::ObjectHash, repo::Repository};

/// Creates a branch pointing at HEAD's commit. Fails if HEAD is unborn or
/// the name is already taken.
pub fn create_branch(repo: &Repository, name: &str) -> Result<ObjectHash, PitError> {
    let head = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    repo.refs.create_branch(name, head)?;
    Ok(head)
}

/// Creates a branch pointing at an arbitrary revision.
pub fn create_branch_at(repo: &Repository, name: &str, rev: &str) -> Result<ObjectHash, PitError> {
    let target = repo.refs.resolve_revision(&repo.store, rev)?;
    repo.refs.create_branch(name, target)?;
    Ok(target)
}

pub fn list_branches(repo: &Repository) -> Result<Vec<String>, PitError> {
    repo.refs.list_branches()
}

pub fn delete_branch(repo: &Repository, name: &str) -> Result<(), PitError> {
    repo.refs.delete_branch(name)
}

/// Creates a lightweight tag pointing at HEAD's commit.
pub fn create_tag(repo: &Repository, name: &str) -> Result<ObjectHash, PitError> {
    let head = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    repo.refs.create_tag(name, head)?;
    Ok(head)
}

/// Creates a lightweight tag pointing at an arbitrary revision.
pub fn create_tag_at(repo: &Repository, name: &str, rev: &str) -> Result<ObjectHash, PitError> {
    let target = repo.refs.resolve_revision(&repo.store, rev)?;
    repo.refs.create_tag(name, target)?;
    Ok(target)
}

pub fn list_tags(repo: &Repository) -> Result<Vec<String>, PitError> {
    repo.refs.list_tags()
}
