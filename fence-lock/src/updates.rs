//! Parsing and classification of pre-receive ref update lines.
//!
//! The hook receives one line per requested transition:
//! `"<old-oid> <new-oid> <refname>"`. An all-zero old oid is a creation, an
//! all-zero new oid is a deletion; both zero is invalid. Both SHA-1 and
//! SHA-256 hex lengths are accepted via `ObjectId::from_hex`.

use gix_hash::ObjectId;

use crate::{Error, BRANCH_NAMESPACE, LOCK_NAMESPACE};

/// A single requested ref transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefUpdate {
    /// Create a new reference pointing at `new`.
    Create {
        /// The object the ref will point at.
        new: ObjectId,
        /// The full ref name.
        name: String,
    },
    /// Update an existing reference from `old` to `new`.
    Update {
        /// The object the ref currently points at.
        old: ObjectId,
        /// The object the ref will point at.
        new: ObjectId,
        /// The full ref name.
        name: String,
    },
    /// Delete an existing reference which pointed at `old`.
    Delete {
        /// The object the ref pointed at.
        old: ObjectId,
        /// The full ref name.
        name: String,
    },
}

/// Namespace routing for one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// A ref under the lock namespace.
    LockToken,
    /// A ref under `refs/heads/`.
    Branch,
    /// Anything else; ignored by enforcement.
    Other,
}

impl RefUpdate {
    /// The refname targeted by this update.
    pub fn name(&self) -> &str {
        match self {
            RefUpdate::Create { name, .. } => name,
            RefUpdate::Update { name, .. } => name,
            RefUpdate::Delete { name, .. } => name,
        }
    }

    /// Which enforcement path this update routes to.
    pub fn kind(&self) -> UpdateKind {
        let name = self.name();
        if name.starts_with(LOCK_NAMESPACE) {
            UpdateKind::LockToken
        } else if name.starts_with(BRANCH_NAMESPACE) {
            UpdateKind::Branch
        } else {
            UpdateKind::Other
        }
    }

    /// Parse one `"<old> <new> <refname>"` line.
    pub fn parse(line: &str) -> Result<Self, Error> {
        let mut it = line.split_whitespace();
        let old_hex = it.next().ok_or_else(|| Error::Protocol("missing <old> oid".into()))?;
        let new_hex = it.next().ok_or_else(|| Error::Protocol("missing <new> oid".into()))?;
        let name = it.next().ok_or_else(|| Error::Protocol("missing <refname>".into()))?;

        // Refnames cannot contain spaces, so extra tokens are invalid.
        if it.next().is_some() {
            return Err(Error::Protocol("unexpected tokens after <refname>".into()));
        }

        let old_is_zero = is_all_zeros(old_hex);
        let new_is_zero = is_all_zeros(new_hex);
        if old_is_zero && new_is_zero {
            return Err(Error::Protocol("both old and new are zero (invalid update)".into()));
        }

        let parse_oid = |hex: &str| {
            ObjectId::from_hex(hex.as_bytes())
                .map_err(|e| Error::Protocol(format!("invalid oid '{hex}': {e}")))
        };

        if old_is_zero {
            return Ok(RefUpdate::Create {
                new: parse_oid(new_hex)?,
                name: name.to_owned(),
            });
        }
        if new_is_zero {
            return Ok(RefUpdate::Delete {
                old: parse_oid(old_hex)?,
                name: name.to_owned(),
            });
        }
        Ok(RefUpdate::Update {
            old: parse_oid(old_hex)?,
            new: parse_oid(new_hex)?,
            name: name.to_owned(),
        })
    }

    /// Parse all non-empty lines of hook stdin.
    pub fn parse_all(input: &str) -> Result<Vec<Self>, Error> {
        input
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// True if all chars are ASCII '0'.
fn is_all_zeros(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b == b'0')
}
