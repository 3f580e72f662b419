//! The storage and history engine: object store, index, tree builder,
//! refs/HEAD, DAG walker, and three-way merge. Everything under
//! [`crate::commands`] is built on top of this module.
pub mod dag;
pub mod index;
pub mod merge;
pub mod object;
pub mod refs;
pub mod tree_builder;
