//! L4: the ref namespace and HEAD symref resolution.
//!
//! `.pit/HEAD` is either `"ref: refs/heads/<name>\n"` (attached) or a bare
//! 40-hex commit hash (detached). Branches and tags are one-file-per-ref
//! under `refs/heads/` and `refs/tags/`. All ref updates are whole-file
//! write-via-rename; there is no locking protocol.

use std::{fs, path::{Path, PathBuf}};

use crate::{errors::PitError, hash::ObjectHash, internal::object::ObjectStore, utils::write_atomic};

const HEAD_REF_PREFIX: &str = "ref: ";

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// Attached to a branch (which may not have a commit yet).
    Branch(String),
    /// Detached at a specific commit.
    Detached(ObjectHash),
    /// Attached to a branch with no commits recorded (fresh `init`).
    Unborn(String),
}

/// Ref and HEAD machinery rooted at `.pit/`.
pub struct Refs {
    pit_dir: PathBuf,
}

impl Refs {
    pub fn new(pit_dir: &Path) -> Self {
        Refs {
            pit_dir: pit_dir.to_path_buf(),
        }
    }

    fn head_path(&self) -> PathBuf {
        self.pit_dir.join("HEAD")
    }

    fn branch_path(&self, name: &str) -> PathBuf {
        self.pit_dir.join("refs").join("heads").join(name)
    }

    fn tag_path(&self, name: &str) -> PathBuf {
        self.pit_dir.join("refs").join("tags").join(name)
    }

    /// Reads `.pit/HEAD`, resolving through at most one symref hop.
    pub fn read_head(&self) -> Result<Head, PitError> {
        let content = fs::read_to_string(self.head_path())?;
        let content = content.trim_end_matches('\n');
        if let Some(branch_ref) = content.strip_prefix(HEAD_REF_PREFIX) {
            let name = branch_ref
                .strip_prefix("refs/heads/")
                .unwrap_or(branch_ref)
                .to_string();
            if self.branch_path(&name).exists() {
                Ok(Head::Branch(name))
            } else {
                Ok(Head::Unborn(name))
            }
        } else if content.is_empty() {
            Ok(Head::Unborn("master".to_string()))
        } else {
            let hash = content
                .parse::<ObjectHash>()
                .map_err(|_| PitError::InvalidConfig(format!("malformed HEAD: {content}")))?;
            Ok(Head::Detached(hash))
        }
    }

    /// Resolves HEAD to a commit hash, or `None` for an unborn branch.
    pub fn head_commit(&self) -> Result<Option<ObjectHash>, PitError> {
        match self.read_head()? {
            Head::Branch(name) => self.read_branch(&name),
            Head::Detached(hash) => Ok(Some(hash)),
            Head::Unborn(_) => Ok(None),
        }
    }

    /// The attached branch name, if any (`None` when detached).
    pub fn current_branch(&self) -> Result<Option<String>, PitError> {
        match self.read_head()? {
            Head::Branch(name) | Head::Unborn(name) => Ok(Some(name)),
            Head::Detached(_) => Ok(None),
        }
    }

    pub fn attach_head(&self, branch: &str) -> Result<(), PitError> {
        write_atomic(
            &self.head_path(),
            format!("{HEAD_REF_PREFIX}refs/heads/{branch}\n").as_bytes(),
        )?;
        Ok(())
    }

    pub fn detach_head(&self, hash: ObjectHash) -> Result<(), PitError> {
        write_atomic(&self.head_path(), format!("{hash}\n").as_bytes())?;
        Ok(())
    }

    /// Updates whichever thing HEAD points at after a new commit is
    /// recorded: the current branch ref when attached, HEAD itself when
    /// detached.
    pub fn update_after_commit(&self, hash: ObjectHash) -> Result<(), PitError> {
        match self.read_head()? {
            Head::Branch(name) | Head::Unborn(name) => self.write_branch(&name, hash),
            Head::Detached(_) => self.detach_head(hash),
        }
    }

    pub fn read_branch(&self, name: &str) -> Result<Option<ObjectHash>, PitError> {
        let path = self.branch_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let hash = content
            .trim()
            .parse::<ObjectHash>()
            .map_err(|_| PitError::InvalidConfig(format!("malformed branch ref: {name}")))?;
        Ok(Some(hash))
    }

    pub fn write_branch(&self, name: &str, hash: ObjectHash) -> Result<(), PitError> {
        write_atomic(&self.branch_path(name), format!("{hash}\n").as_bytes())?;
        Ok(())
    }

    /// Creates a new branch ref at `hash`. Fails if it already exists.
    pub fn create_branch(&self, name: &str, hash: ObjectHash) -> Result<(), PitError> {
        validate_ref_name(name)?;
        if self.branch_path(name).exists() {
            return Err(PitError::BranchExists(name.to_string()));
        }
        self.write_branch(name, hash)
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.branch_path(name).exists()
    }

    pub fn list_branches(&self) -> Result<Vec<String>, PitError> {
        list_ref_names(&self.pit_dir.join("refs").join("heads"))
    }

    pub fn delete_branch(&self, name: &str) -> Result<(), PitError> {
        let path = self.branch_path(name);
        if !path.exists() {
            return Err(PitError::UnknownBranch(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Creates a lightweight tag pointer. Fails when the name is empty,
    /// contains a path separator, or begins with a dot.
    pub fn create_tag(&self, name: &str, hash: ObjectHash) -> Result<(), PitError> {
        validate_ref_name(name)?;
        write_atomic(&self.tag_path(name), format!("{hash}\n").as_bytes())?;
        Ok(())
    }

    pub fn read_tag(&self, name: &str) -> Result<Option<ObjectHash>, PitError> {
        let path = self.tag_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let hash = content
            .trim()
            .parse::<ObjectHash>()
            .map_err(|_| PitError::InvalidConfig(format!("malformed tag ref: {name}")))?;
        Ok(Some(hash))
    }

    pub fn list_tags(&self) -> Result<Vec<String>, PitError> {
        list_ref_names(&self.pit_dir.join("refs").join("tags"))
    }

    /// Resolves a revision string to a commit hash, trying in order: `HEAD`
    /// (case-insensitive), branch name, tag name, full hash, then a 4-39
    /// hex prefix restricted to commit objects.
    pub fn resolve_revision(&self, store: &ObjectStore, rev: &str) -> Result<ObjectHash, PitError> {
        if rev.eq_ignore_ascii_case("HEAD") {
            return self
                .head_commit()?
                .ok_or_else(|| PitError::UnknownRevision(rev.to_string()));
        }
        if let Some(hash) = self.read_branch(rev)? {
            return Ok(hash);
        }
        if let Some(hash) = self.read_tag(rev)? {
            return Ok(hash);
        }
        if rev.len() == ObjectHash::HEX_LEN {
            if let Ok(hash) = rev.parse::<ObjectHash>() {
                if matches!(
                    store.read_object(hash),
                    Ok((crate::internal::object::ObjectType::Commit, _))
                ) {
                    return Ok(hash);
                }
            }
        }
        if crate::hash::is_hex_prefix(rev) && rev.len() < ObjectHash::HEX_LEN {
            return store.resolve_commit_prefix(rev);
        }
        Err(PitError::UnknownRevision(rev.to_string()))
    }
}

fn list_ref_names(dir: &Path) -> Result<Vec<String>, PitError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn validate_ref_name(name: &str) -> Result<(), PitError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
        return Err(PitError::InvalidRefName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn refs() -> (tempfile::TempDir, Refs) {
        let dir = tempdir().unwrap();
        let pit = dir.path().join(".pit");
        fs::create_dir_all(pit.join("refs/heads")).unwrap();
        fs::create_dir_all(pit.join("refs/tags")).unwrap();
        fs::write(pit.join("HEAD"), "ref: refs/heads/master\n").unwrap();
        (dir, Refs::new(&pit))
    }

    #[test]
    fn fresh_head_is_unborn() {
        let (_dir, refs) = refs();
        assert_eq!(refs.read_head().unwrap(), Head::Unborn("master".to_string()));
        assert_eq!(refs.head_commit().unwrap(), None);
    }

    #[test]
    fn create_branch_then_attach_resolves() {
        let (_dir, refs) = refs();
        let hash = ObjectHash::of(b"c1");
        refs.write_branch("master", hash).unwrap();
        assert_eq!(refs.head_commit().unwrap(), Some(hash));
        assert_eq!(refs.current_branch().unwrap(), Some("master".to_string()));
    }

    #[test]
    fn detach_then_update_after_commit_rewrites_head_directly() {
        let (_dir, refs) = refs();
        let hash = ObjectHash::of(b"c1");
        refs.detach_head(hash).unwrap();
        assert_eq!(refs.read_head().unwrap(), Head::Detached(hash));
        let hash2 = ObjectHash::of(b"c2");
        refs.update_after_commit(hash2).unwrap();
        assert_eq!(refs.head_commit().unwrap(), Some(hash2));
    }

    #[test]
    fn create_branch_twice_fails() {
        let (_dir, refs) = refs();
        let hash = ObjectHash::of(b"c1");
        refs.create_branch("feature", hash).unwrap();
        assert!(matches!(
            refs.create_branch("feature", hash),
            Err(PitError::BranchExists(_))
        ));
    }

    #[test]
    fn tag_name_validation_rejects_dotted_and_empty() {
        let (_dir, refs) = refs();
        let hash = ObjectHash::of(b"c1");
        assert!(refs.create_tag("", hash).is_err());
        assert!(refs.create_tag(".hidden", hash).is_err());
        assert!(refs.create_tag("v1", hash).is_ok());
    }

    #[test]
    fn list_branches_sorted() {
        let (_dir, refs) = refs();
        let hash = ObjectHash::of(b"c1");
        refs.create_branch("zeta", hash).unwrap();
        refs.create_branch("alpha", hash).unwrap();
        assert_eq!(refs.list_branches().unwrap(), vec!["alpha", "zeta"]);
    }
}
