//! Built-in guard rules.
//!
//! Each rule is constructed from an options struct and compiles its glob
//! sets once, so a `run` only queries the repository and matches paths.

mod allowed_dirs;
mod mtime_compare;
mod upstream_conflict;

pub use allowed_dirs::{AllowedDirs, AllowedDirsOptions};
pub use mtime_compare::{MtimeCompare, MtimeCompareOptions};
pub use upstream_conflict::{UpstreamConflict, UpstreamConflictOptions};
