//! `reset`: unstages paths from the index without touching the working
//! tree.

use crate::{errors::PitError, repo::Repository};

/// Removes `paths` from the index. A no-op for paths that aren't staged.
/// Never modifies the working directory.
pub fn reset_paths(repo: &Repository, paths: &[String]) -> Result<(), PitError> {
    let mut index = repo.load_index()?;
    for path in paths {
        index.unstage(path);
    }
    repo.save_index(&index)
}
