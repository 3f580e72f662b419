//! `clean`: removes untracked, unignored files (and whole untracked
//! directories, with `-d`) from the working tree.

use std::{collections::BTreeSet, fs, path::Path};

use crate::{errors::PitError, ignore::IgnoreMatcher, repo::Repository, utils::to_host_path};

fn collect(
    dir: &Path,
    prefix: &str,
    tracked: &BTreeSet<String>,
    matcher: &IgnoreMatcher,
    include_dirs: bool,
    out: &mut Vec<String>,
) -> Result<(), PitError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if prefix.is_empty() && name == ".pit" {
            continue;
        }
        let slash_path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();

        if path.is_dir() {
            let is_ignored = matcher.is_ignored(&slash_path);
            let has_tracked_descendant = tracked.iter().any(|t| {
                t == &slash_path || t.starts_with(&format!("{slash_path}/"))
            });
            if is_ignored {
                // An ignored directory is never traversed; if it's
                // entirely untracked, it is itself the candidate.
                if include_dirs && !has_tracked_descendant {
                    out.push(slash_path);
                }
                continue;
            }
            if include_dirs && !has_tracked_descendant {
                out.push(slash_path);
                continue;
            }
            collect(&path, &slash_path, tracked, matcher, include_dirs, out)?;
        } else {
            if matcher.is_ignored(&slash_path) {
                continue;
            }
            if !tracked.contains(&slash_path) {
                out.push(slash_path);
            }
        }
    }
    Ok(())
}

/// Lists the paths `clean` would remove, without removing anything.
pub fn clean_candidates(repo: &Repository, include_dirs: bool) -> Result<Vec<String>, PitError> {
    let index = repo.load_index()?;
    let tracked: BTreeSet<String> = index.paths().cloned().collect();
    let matcher = repo.ignore_matcher()?;
    let mut out = Vec::new();
    collect(&repo.root, "", &tracked, &matcher, include_dirs, &mut out)?;
    out.sort();
    Ok(out)
}

/// Removes every clean-candidate path from the working tree and returns
/// what was removed.
pub fn clean(repo: &Repository, include_dirs: bool) -> Result<Vec<String>, PitError> {
    let candidates = clean_candidates(repo, include_dirs)?;
    for path in &candidates {
        let host_path = to_host_path(&repo.root, path);
        if host_path.is_dir() {
            fs::remove_dir_all(&host_path)?;
        } else {
            fs::remove_file(&host_path)?;
        }
    }
    Ok(candidates)
}
