//! L7: the state-machine commands that compose L1-L6 into the operations a
//! driver invokes — commit, branch/tag/checkout, merge, rebase, revert,
//! cherry-pick, stash, clean, reset. Each module owns one command (or a
//! small family); shared logic (three-way merge, DAG queries) lives in
//! [`crate::internal`] so it is not duplicated per command.
//!
//! Argument parsing, human-readable printing, and remote transport are out
//! of scope — these functions are the boundary a driver calls into.
pub mod branch;
pub mod checkout;
pub mod cherry_pick;
pub mod clean;
pub mod commit;
pub mod merge;
pub mod rebase;
pub mod reset;
pub mod revert;
pub mod stash;

use chrono::Utc;

use crate::internal::object::commit::Identity;

/// Builds an [`Identity`] from config values and the current time, in the
/// `"<name> <<email>> <unix-ts> <tz>"` shape every command that records a
/// commit needs.
pub(crate) fn identity_now(name: &str, email: &str) -> Identity {
    Identity::new(name, email, Utc::now().timestamp(), "+0000")
}
