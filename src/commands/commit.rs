//! `commit`: builds a tree from the staging index and records a new commit
//! object, then advances the current branch (attached) or HEAD (detached).

use crate::{
    commands::identity_now,
    errors::PitError,
    hash::ObjectHash,
    internal::object::{ObjectType, commit::Commit},
    internal::tree_builder::build_tree,
    repo::Repository,
};

/// Records a commit from the current staging index.
///
/// Preconditions: the index is non-empty and `[user] name`/`email` are
/// configured. Fails with [`PitError::NothingToCommit`] /
/// [`PitError::NoIdentity`] otherwise.
pub fn commit(repo: &Repository, message: &str) -> Result<ObjectHash, PitError> {
    let index = repo.load_index()?;
    if index.is_empty() {
        return Err(PitError::NothingToCommit);
    }
    let (name, email) = repo.identity()?;

    let tree_hash = build_tree(&repo.store, &index.to_hash_map())?;
    let parents = repo.refs.head_commit()?.into_iter().collect::<Vec<_>>();

    let identity = identity_now(&name, &email);
    let commit = Commit::new(tree_hash, parents, identity.clone(), identity, message);
    let hash = repo
        .store
        .hash_object(&commit.encode(), ObjectType::Commit, true)?;
    repo.refs.update_after_commit(hash)?;
    Ok(hash)
}
