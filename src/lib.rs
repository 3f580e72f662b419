//! `pit` is a library implementing a local, distributed-style version control
//! engine modeled on Git's object and refs design: a content-addressed
//! object store, a Merkle tree builder, a staging index, ref/HEAD
//! machinery, commit-DAG traversal, a blob-granular three-way merge engine,
//! and the state-machine commands that compose them.
//!
//! The crate is organized bottom-up, mirroring the layering in the design
//! spec: [`internal::object`] (L1) under [`internal::index`] (L2) under
//! [`internal::tree_builder`] (L3) under [`internal::refs`] (L4) under
//! [`internal::dag`] (L5) under [`internal::merge`] (L6), with
//! [`commands`] (L7) orchestrating all of the above through [`repo::Repository`].
pub mod commands;
pub mod config;
pub mod errors;
pub mod hash;
pub mod ignore;
pub mod internal;
pub mod repo;
pub mod utils;
