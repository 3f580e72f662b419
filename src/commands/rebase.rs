//! `rebase`: replays HEAD's own commits one at a time onto another tip,
//! persisting progress under `.pit/rebase-apply/` so `--continue`/`--abort`
//! can resume or unwind a rebase left mid-flight by a conflict.

use std::{collections::HashSet, fs};

use tracing::info;

use crate::{
    commands::identity_now,
    errors::PitError,
    hash::ObjectHash,
    internal::{
        dag::{filter_non_merge, reachable, topo_sort},
        merge::three_way_merge,
        object::{ObjectType, commit::Commit},
        tree_builder::{build_tree, commit_files},
    },
    repo::Repository,
    utils::{to_host_path, write_atomic},
};

enum ReplayResult {
    Committed(ObjectHash),
    Conflict(Vec<String>),
}

fn head_name_path(repo: &Repository) -> std::path::PathBuf {
    repo.rebase_dir().join("head-name")
}

fn orig_head_path(repo: &Repository) -> std::path::PathBuf {
    repo.rebase_dir().join("orig-head")
}

fn commits_path(repo: &Repository) -> std::path::PathBuf {
    repo.rebase_dir().join("commits")
}

fn read_state(repo: &Repository) -> Result<(String, ObjectHash, Vec<ObjectHash>), PitError> {
    let head_name = fs::read_to_string(head_name_path(repo))?.trim().to_string();
    let orig_head = fs::read_to_string(orig_head_path(repo))?
        .trim()
        .parse::<ObjectHash>()
        .map_err(|_| PitError::InvalidConfig("malformed orig-head".into()))?;
    let commits = fs::read_to_string(commits_path(repo))?
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<ObjectHash>()
                .map_err(|_| PitError::InvalidConfig(format!("malformed rebase commit entry: {l}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((head_name, orig_head, commits))
}

fn write_commits(repo: &Repository, commits: &[ObjectHash]) -> Result<(), PitError> {
    let mut out = String::new();
    for c in commits {
        out.push_str(&format!("{c}\n"));
    }
    write_atomic(&commits_path(repo), out.as_bytes())
}

/// Starts a rebase of the current branch (or detached HEAD) onto
/// `upstream`: detaches HEAD at upstream's tree, then replays every
/// non-merge commit reachable from HEAD but not from upstream, in
/// topological order.
pub fn rebase_start(repo: &Repository, upstream: &str) -> Result<ObjectHash, PitError> {
    if repo.rebase_dir().exists() {
        return Err(PitError::RebaseInProgress);
    }
    let orig_head = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    let ours_files = commit_files(&repo.store, orig_head)?;
    if !repo.is_clean(&ours_files)? {
        return Err(PitError::DirtyWorkingTree);
    }
    let upstream_hash = repo.refs.resolve_revision(&repo.store, upstream)?;
    let head_name = repo
        .refs
        .current_branch()?
        .unwrap_or_else(|| "HEAD".to_string());

    let from_head = reachable(&repo.store, orig_head)?;
    let from_upstream = reachable(&repo.store, upstream_hash)?;
    let to_replay: HashSet<ObjectHash> = from_head.difference(&from_upstream).copied().collect();
    let to_replay = filter_non_merge(&repo.store, to_replay)?;
    let ordered = topo_sort(&repo.store, &to_replay)?;

    let upstream_files = commit_files(&repo.store, upstream_hash)?;
    repo.reset_to_tree(&upstream_files)?;
    repo.refs.detach_head(upstream_hash)?;

    if ordered.is_empty() {
        finish_rebase(repo, &head_name, upstream_hash)?;
        return Ok(upstream_hash);
    }

    fs::create_dir_all(repo.rebase_dir())?;
    write_atomic(&head_name_path(repo), format!("{head_name}\n").as_bytes())?;
    write_atomic(&orig_head_path(repo), format!("{orig_head}\n").as_bytes())?;
    write_commits(repo, &ordered)?;

    info!(commits = ordered.len(), upstream = upstream, "rebase started");
    replay_loop(repo)
}

/// Replays a single original commit onto the current (detached) HEAD by
/// three-way-merging the diff it introduced relative to its first parent.
fn replay_commit(repo: &Repository, commit_hash: ObjectHash) -> Result<ReplayResult, PitError> {
    let (_, payload) = repo.store.read_object(commit_hash)?;
    let original = Commit::decode(&payload)?;

    let base_files = match original.first_parent() {
        Some(parent) => commit_files(&repo.store, parent)?,
        None => Default::default(),
    };
    let ours_hash = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    let ours_files = commit_files(&repo.store, ours_hash)?;
    let theirs_files = commit_files(&repo.store, commit_hash)?;

    let outcome = three_way_merge(&repo.store, &base_files, &ours_files, &theirs_files)?;

    if outcome.is_clean() {
        let tree_hash = build_tree(&repo.store, &outcome.merged)?;
        let committer = identity_now(&original.committer.name, &original.committer.email);
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
        Ok(ReplayResult::Committed(hash))
    } else {
        for (path, hash) in &outcome.merged {
            repo.materialize_blob(path, *hash)?;
        }
        for (path, content) in &outcome.conflict_content {
            let host_path = to_host_path(&repo.root, path);
            if let Some(parent) = host_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&host_path, content)?;
        }
        Ok(ReplayResult::Conflict(outcome.conflicts))
    }
}

/// Drains the remaining-commits list, replaying each in turn, stopping
/// (with the rebase state left on disk) at the first conflict.
fn replay_loop(repo: &Repository) -> Result<ObjectHash, PitError> {
    loop {
        let (head_name, _orig_head, mut commits) = read_state(repo)?;
        let Some(&next) = commits.first() else {
            let current = repo
                .refs
                .head_commit()?
                .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
            finish_rebase(repo, &head_name, current)?;
            return Ok(current);
        };
        match replay_commit(repo, next)? {
            ReplayResult::Committed(hash) => {
                repo.refs.detach_head(hash)?;
                commits.remove(0);
                write_commits(repo, &commits)?;
            }
            ReplayResult::Conflict(paths) => {
                info!(commit = %next, "rebase stopped on conflict");
                return Err(PitError::MergeConflict(paths));
            }
        }
    }
}

/// Resumes a rebase after manual conflict resolution: synthesizes the
/// commit that was in flight from the currently-staged index (reusing
/// the original commit's message and author), then replays whatever
/// commits remain.
pub fn rebase_continue(repo: &Repository) -> Result<ObjectHash, PitError> {
    if !repo.rebase_dir().exists() {
        return Err(PitError::NoRebaseInProgress);
    }
    let (_head_name, _orig_head, mut commits) = read_state(repo)?;
    let commit_hash = *commits.first().ok_or(PitError::NoRebaseInProgress)?;
    let (_, payload) = repo.store.read_object(commit_hash)?;
    let original = Commit::decode(&payload)?;

    let index = repo.load_index()?;
    let tree_hash = build_tree(&repo.store, &index.to_hash_map())?;
    let ours_hash = repo
        .refs
        .head_commit()?
        .ok_or(PitError::UnknownRevision("HEAD".to_string()))?;
    let committer = identity_now(&original.committer.name, &original.committer.email);
    let synthesized = Commit::new(
        tree_hash,
        vec![ours_hash],
        original.author.clone(),
        committer,
        original.message.clone(),
    );
    let hash = repo
        .store
        .hash_object(&synthesized.encode(), ObjectType::Commit, true)?;
    repo.refs.detach_head(hash)?;

    commits.remove(0);
    write_commits(repo, &commits)?;

    replay_loop(repo)
}

/// Abandons an in-progress rebase: restores the original HEAD's tree and
/// ref state, then removes the rebase state directory.
pub fn rebase_abort(repo: &Repository) -> Result<(), PitError> {
    if !repo.rebase_dir().exists() {
        return Err(PitError::NoRebaseInProgress);
    }
    let (head_name, orig_head, _commits) = read_state(repo)?;
    let orig_files = commit_files(&repo.store, orig_head)?;
    repo.reset_to_tree(&orig_files)?;
    if head_name == "HEAD" {
        repo.refs.detach_head(orig_head)?;
    } else {
        repo.refs.attach_head(&head_name)?;
    }
    fs::remove_dir_all(repo.rebase_dir())?;
    Ok(())
}

fn finish_rebase(repo: &Repository, head_name: &str, final_hash: ObjectHash) -> Result<(), PitError> {
    if head_name == "HEAD" {
        repo.refs.detach_head(final_hash)?;
    } else {
        repo.refs.write_branch(head_name, final_hash)?;
        repo.refs.attach_head(head_name)?;
    }
    if repo.rebase_dir().exists() {
        fs::remove_dir_all(repo.rebase_dir())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::checkout::{checkout_branch, checkout_new_branch};
    use crate::commands::commit::commit;
    use crate::config::Config;
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
    fn rebase_with_no_conflicts_replays_onto_new_base() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        checkout_new_branch(&repo, "feature").unwrap();
        stage_and_commit(&dir, &repo, "b.txt", b"2", "c2");
        checkout_branch(&repo, "master").unwrap();
        stage_and_commit(&dir, &repo, "c.txt", b"3", "c3");
        checkout_branch(&repo, "feature").unwrap();

        let result = rebase_start(&repo, "master").unwrap();
        let files = commit_files(&repo.store, result).unwrap();
        assert!(files.contains_key("a.txt"));
        assert!(files.contains_key("b.txt"));
        assert!(files.contains_key("c.txt"));
        assert_eq!(repo.refs.read_branch("feature").unwrap(), Some(result));
        assert_eq!(repo.refs.current_branch().unwrap(), Some("feature".to_string()));
        assert!(!repo.rebase_dir().exists());
    }

    #[test]
    fn rebase_conflict_then_continue_resumes_and_finishes() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "f.txt", b"base", "c1");
        checkout_new_branch(&repo, "feature").unwrap();
        stage_and_commit(&dir, &repo, "f.txt", b"feature-version", "c2");
        checkout_branch(&repo, "master").unwrap();
        stage_and_commit(&dir, &repo, "f.txt", b"master-version", "c3");
        checkout_branch(&repo, "feature").unwrap();

        let err = rebase_start(&repo, "master").unwrap_err();
        assert!(matches!(err, PitError::MergeConflict(ref p) if p == &vec!["f.txt".to_string()]));
        assert!(repo.rebase_dir().exists());

        fs::write(dir.path().join("f.txt"), b"resolved").unwrap();
        let (hash, mtime, size) = repo.hash_file("f.txt", true).unwrap();
        let mut index = repo.load_index().unwrap();
        index.stage("f.txt", hash, mtime, size);
        repo.save_index(&index).unwrap();

        let result = rebase_continue(&repo).unwrap();
        assert!(!repo.rebase_dir().exists());
        let files = commit_files(&repo.store, result).unwrap();
        assert_eq!(files.get("f.txt"), Some(&hash));
        assert_eq!(repo.refs.read_branch("feature").unwrap(), Some(result));
    }

    #[test]
    fn rebase_abort_restores_original_branch_state() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "f.txt", b"base", "c1");
        checkout_new_branch(&repo, "feature").unwrap();
        stage_and_commit(&dir, &repo, "f.txt", b"feature-version", "c2");
        let feature_head = repo.refs.head_commit().unwrap().unwrap();
        checkout_branch(&repo, "master").unwrap();
        stage_and_commit(&dir, &repo, "f.txt", b"master-version", "c3");
        checkout_branch(&repo, "feature").unwrap();

        rebase_start(&repo, "master").unwrap_err();
        rebase_abort(&repo).unwrap();

        assert!(!repo.rebase_dir().exists());
        assert_eq!(repo.refs.current_branch().unwrap(), Some("feature".to_string()));
        assert_eq!(repo.refs.read_branch("feature").unwrap(), Some(feature_head));
        assert_eq!(repo.refs.head_commit().unwrap(), Some(feature_head));
    }

    #[test]
    fn continue_and_abort_without_rebase_in_progress_fail() {
        let (_dir, repo) = setup();
        assert!(matches!(rebase_continue(&repo), Err(PitError::NoRebaseInProgress)));
        assert!(matches!(rebase_abort(&repo), Err(PitError::NoRebaseInProgress)));
    }

    #[test]
    fn fast_forward_rebase_with_nothing_to_replay() {
        let (dir, repo) = setup();
        stage_and_commit(&dir, &repo, "a.txt", b"1", "c1");
        checkout_new_branch(&repo, "feature").unwrap();
        checkout_branch(&repo, "master").unwrap();
        stage_and_commit(&dir, &repo, "b.txt", b"2", "c2");
        checkout_branch(&repo, "feature").unwrap();

        let result = rebase_start(&repo, "master").unwrap();
        assert_eq!(result, repo.refs.read_branch("master").unwrap().unwrap());
        assert!(!repo.rebase_dir().exists());
    }
}
