//! fence-lock: ref-encoded pessimistic locks enforced at push reception.
//!
//! A lock token is a git ref of the form
//! `refs/fence/sem/<key>/<owner>@<expiry>/<nonce>`: the ref's existence is
//! the acquisition and deleting it is the release. There is no persistence
//! layer of its own; all mutable state lives in the ref store. Correctness
//! under concurrent pushes rests on the hosting git server applying one
//! push's ref updates as an atomic, serialized transaction per repository —
//! an external guarantee this crate depends on and does not reimplement.
//!
//! The server-side hook built on this crate never writes; it only admits or
//! rejects the transitions a push requests.

#![forbid(unsafe_code)]

pub mod enforce;
pub mod policy;
pub mod token;
pub mod updates;

pub use enforce::{Decision, Enforcer, Reason};
pub use policy::{KeyPolicy, LockPolicy};
pub use token::Token;
pub use updates::{RefUpdate, UpdateKind};

/// Ref namespace prefix under which lock tokens live.
pub const LOCK_NAMESPACE: &str = "refs/fence/sem/";

/// Branch namespace subject to protected-path enforcement.
pub const BRANCH_NAMESPACE: &str = "refs/heads/";

/// In-tree path of the lock policy document, read from the incoming commit.
pub const POLICY_PATH: &str = ".fence/lock-policy.json";

/// Error type for parsing and enforcement.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed hook input, e.g. a bad update line or object id.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// A mandatory repository query failed.
    #[error(transparent)]
    Inspect(#[from] fence_core::repo::Error),
}
