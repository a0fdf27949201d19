//! The lock policy document.
//!
//! JSON at [`crate::POLICY_PATH`] inside the repository tree, read from the
//! incoming commit of the push so policy changes take effect atomically
//! with the commit that introduces them. The document is loaded fresh on
//! every push; nothing is cached across invocations.

use std::collections::BTreeMap;

use fence_core::repo::Repository;
use gix_hash::ObjectId;
use serde::{Deserialize, Serialize};

use crate::POLICY_PATH;

/// Policy for one lock key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyPolicy {
    /// Maximum number of simultaneously valid tokens.
    pub capacity: u32,
    /// Suggested token lifetime for clients; not enforced server-side.
    pub ttl_seconds: u64,
    /// Protected-path globs; empty means the key never triggers
    /// branch-side enforcement but can still be acquired and released.
    pub patterns: Vec<String>,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            capacity: 1,
            ttl_seconds: 0,
            patterns: Vec::new(),
        }
    }
}

/// The parsed policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockPolicy {
    /// Actors exempt from capacity and ownership checks.
    pub admins: Vec<String>,
    /// Per-key policies; unknown keys fall back to [`KeyPolicy::default`].
    pub keys: BTreeMap<String, KeyPolicy>,
}

impl LockPolicy {
    /// Parse the JSON document.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The policy for `key`, defaulting when the key is not configured.
    pub fn for_key(&self, key: &str) -> KeyPolicy {
        self.keys.get(key).cloned().unwrap_or_default()
    }

    /// Whether `actor` is an admin (case-insensitive).
    pub fn is_admin(&self, actor: &str) -> bool {
        self.admins
            .iter()
            .any(|admin| fence_core::identity::same_actor(admin, actor))
    }

    /// Load the policy for one push.
    ///
    /// Reads [`POLICY_PATH`] from the incoming commit when given, falling
    /// back to the current `HEAD` tip, falling back to the empty policy.
    /// An unparsable document is skipped with a warning rather than
    /// enforced half-understood.
    pub fn load(repo: &Repository, incoming: Option<&ObjectId>) -> Self {
        let revs = incoming
            .map(ToString::to_string)
            .into_iter()
            .chain(std::iter::once("HEAD".to_string()));
        for rev in revs {
            let Some(text) = repo.show_file(&rev, POLICY_PATH) else {
                continue;
            };
            match Self::parse(&text) {
                Ok(policy) => return policy,
                Err(err) => log::warn!("ignoring unparsable lock policy at {rev}: {err}"),
            }
        }
        Self::default()
    }
}
