//! Lock tokens encoded entirely in ref names.
//!
//! `refs/fence/sem/<key>/<owner>@<expiry>/<nonce>`: a single-segment key,
//! an owner that must not contain `/` or `@`, a decimal epoch-seconds
//! expiry where `0` means "no expiry", and an opaque non-empty nonce that
//! disambiguates multiple tokens held by the same owner.

use fence_core::identity;

use crate::LOCK_NAMESPACE;

/// A lock token decoded from its ref name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The full ref name this token was decoded from.
    pub ref_name: String,
    /// The lock key the token belongs to.
    pub key: String,
    /// The pusher identity that holds the token.
    pub owner: String,
    /// Expiry as Unix epoch seconds; `0` means no expiry.
    pub expiry: u64,
    /// Opaque unique suffix.
    pub nonce: String,
}

impl Token {
    /// Decode a token from its ref name; `None` when the name does not
    /// follow the token shape.
    pub fn parse(ref_name: &str) -> Option<Self> {
        let rest = ref_name.strip_prefix(LOCK_NAMESPACE)?;
        let mut segments = rest.splitn(3, '/');
        let key = segments.next()?;
        let owner_expiry = segments.next()?;
        let nonce = segments.next()?;
        if key.is_empty() || nonce.is_empty() {
            return None;
        }
        let (owner, expiry) = owner_expiry.rsplit_once('@')?;
        if owner.is_empty() || owner.contains('@') {
            return None;
        }
        let expiry: u64 = expiry.parse().ok()?;
        Some(Self {
            ref_name: ref_name.to_owned(),
            key: key.to_owned(),
            owner: owner.to_owned(),
            expiry,
            nonce: nonce.to_owned(),
        })
    }

    /// Compose the ref name for a token.
    pub fn encode(key: &str, owner: &str, expiry: u64, nonce: &str) -> String {
        format!("{LOCK_NAMESPACE}{key}/{owner}@{expiry}/{nonce}")
    }

    /// Whether the token still counts as held at `now`.
    pub fn is_valid(&self, now: u64) -> bool {
        self.expiry == 0 || self.expiry > now
    }

    /// Whether the token has an expiry that has passed; anyone may reclaim
    /// such a token.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry != 0 && self.expiry <= now
    }

    /// Whether `actor` holds this token (case-insensitive).
    pub fn owned_by(&self, actor: &str) -> bool {
        identity::same_actor(&self.owner, actor)
    }
}
