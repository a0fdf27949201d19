//! fence-core: shared building blocks for the ref-fence hook binaries.
//!
//! This crate provides the minimal, reusable primitives used by both the
//! client-side guard runner (`fence-guard`) and the server-side lock
//! enforcement (`fence-lock`):
//!
//! - a dependency-free glob compiler for path patterns,
//! - a read-only repository inspector driving the `git` binary,
//! - pusher identity resolution for server-side hooks.
//!
#![deny(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod glob;
pub mod identity;
pub mod repo;
