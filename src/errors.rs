//! Error types for the `pit` crate.
//!
//! A single `thiserror`-derived enum covers every condition the core surfaces
//! at its boundary: object-store failures, revision resolution failures,
//! command preconditions, and the transient-state preconditions for
//! merge/rebase/stash. Callers (the command layer, and eventually a driver)
//! match on variants rather than parsing message strings.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the `pit` core.
pub enum PitError {
    /// No `.pit/` directory found walking up from the current directory.
    #[error("not a pit repository (or any parent up to root)")]
    NotARepository,

    /// The object type tag on disk or in a hash request is not recognized.
    #[error("`{0}` is not a valid object type")]
    InvalidObjectType(String),

    /// A tree object's payload does not parse as newline-joined entries.
    #[error("not a valid tree object: {0}")]
    InvalidTreeObject(String),

    /// A single tree entry line does not parse as `<mode> <kind> <hash>\t<name>`.
    #[error("`{0}` is not a valid tree item")]
    InvalidTreeItem(String),

    /// A tree was built from zero entries.
    #[error("tree has no entries: {0}")]
    EmptyTreeItems(String),

    /// A commit object's payload is missing a required header line.
    #[error("not a valid commit object: {0}")]
    InvalidCommitObject(String),

    /// An identity line (`author`/`committer`) does not parse.
    #[error("not a valid identity line: {0}")]
    InvalidIdentity(String),

    /// Requested object hash has no corresponding file under `objects/`.
    #[error("object not found: {0}")]
    ObjectMissing(String),

    /// Object file exists but fails to decompress or its header is malformed.
    #[error("corrupt object {0}: {1}")]
    CorruptObject(String, String),

    /// A hex prefix matched more than one object.
    #[error("ambiguous prefix `{0}` matches multiple objects")]
    AmbiguousPrefix(String),

    /// A revision string did not resolve to any commit.
    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    /// `commit` was invoked with an empty index.
    #[error("nothing to commit (staging index is empty)")]
    NothingToCommit,

    /// `commit` was invoked without `[user] name`/`email` configured.
    #[error("no identity configured (set user.name and user.email)")]
    NoIdentity,

    /// `branch <name>` when the ref file already exists.
    #[error("branch already exists: {0}")]
    BranchExists(String),

    /// A branch name did not resolve to a ref file.
    #[error("no such branch: {0}")]
    UnknownBranch(String),

    /// A ref/branch/tag name fails the naming rules (empty, separators, leading dot).
    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    /// A precondition for checkout/merge/rebase/stash-pop: the tree must be clean.
    #[error("working tree has uncommitted changes")]
    DirtyWorkingTree,

    /// Three-way merge produced one or more conflicted paths.
    #[error("merge conflict in {0:?}")]
    MergeConflict(Vec<String>),

    /// A rebase/`--continue`/`--abort` invoked while one is already in progress.
    #[error("a rebase is already in progress")]
    RebaseInProgress,

    /// `rebase --continue`/`--abort` invoked with no rebase state present.
    #[error("no rebase in progress")]
    NoRebaseInProgress,

    /// A cherry-pick/revert target has more parents than the operation supports.
    #[error("commit {0} has more than one parent")]
    TooManyParents(String),

    /// A revert target has no parent to diff against.
    #[error("commit {0} has no parent to revert against")]
    NoParentToRevert(String),

    /// Malformed INI config content.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Anything else from the host filesystem.
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PitError>;
