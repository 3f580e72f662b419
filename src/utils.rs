//! Small filesystem helpers shared across the object store, refs, and index:
//! atomic write-via-rename, and path normalization to the forward-slash form
//! the on-disk formats require regardless of host OS.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Writes `contents` to `path` atomically: write to a uniquely-named
/// temporary sibling file, then rename into place. This is what makes
/// object writes, ref updates, and index rewrites safe under concurrent,
/// lock-free, last-writer-wins access.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    fs::create_dir_all(parent)?;
    let tmp_name = format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("write"),
        std::process::id()
    );
    let tmp_path = parent.join(tmp_name);
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Normalizes a path's separators to `/`, independent of host OS, for
/// storage in the index and in tree entries.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits a slash-joined path into its directory components, e.g.
/// `"a/b/c.txt"` -> `["a", "b", "c.txt"]`.
pub fn split_components(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Removes empty ancestor directories of `path`, stopping at (and never
/// removing) `stop_at`. Used after deleting a tracked file during a
/// working-directory swap.
pub fn remove_empty_ancestors(path: &Path, stop_at: &Path) {
    let mut dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => return,
    };
    while dir != stop_at && dir.starts_with(stop_at) {
        match fs::read_dir(&dir) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    break;
                }
            }
            Err(_) => break,
        }
        if fs::remove_dir(&dir).is_err() {
            break;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }
}

/// Joins a repository-root-relative slash path onto a base directory,
/// translating `/` to the host separator.
pub fn to_host_path(base: &Path, slash_path: &str) -> PathBuf {
    let mut p = base.to_path_buf();
    for component in split_components(slash_path) {
        p.push(component);
    }
    p
}
