//! Push-time admission for lock refs and protected branches.
//!
//! The decision logic is pure: `(policy, tokens, update, pusher, now)` in,
//! accept or reject out. [`Enforcer`] wires those functions to the
//! repository inspector for one hook invocation; it performs no writes, so
//! a rejection can always abort the whole push transaction safely.

use fence_core::glob::GlobSet;
use fence_core::repo::Repository;

use crate::{Error, LockPolicy, RefUpdate, Token, UpdateKind, LOCK_NAMESPACE};

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// The transition is admitted.
    Allowed,
    /// Token creation would exceed the key's capacity.
    AtCapacity,
    /// Token deletion by someone who is neither owner nor admin, before
    /// expiry.
    NotOwner,
    /// A branch update touches protected paths without a held lock.
    MissingLock,
    /// A lock ref that does not follow the token shape.
    MalformedToken,
}

/// The outcome of evaluating one ref update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the transition is admitted.
    pub allowed: bool,
    /// Reason code for programmatic handling.
    pub reason: Reason,
    /// Human-readable message shown to the pusher on rejection.
    pub message: String,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: Reason::Allowed,
            message: String::new(),
        }
    }

    fn deny(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason,
            message: message.into(),
        }
    }
}

/// Admission for creating a token under `key`.
///
/// The capacity check counts currently-valid tokens before the creation is
/// admitted, bounding concurrent holders to exactly the configured
/// capacity: a counting semaphore. Admins bypass the bound.
pub fn admit_token_create(
    policy: &LockPolicy,
    key: &str,
    existing: &[Token],
    pusher: &str,
    now: u64,
) -> Decision {
    let key_policy = policy.for_key(key);
    let valid = existing.iter().filter(|t| t.is_valid(now)).count();
    if valid >= key_policy.capacity as usize && !policy.is_admin(pusher) {
        return Decision::deny(
            Reason::AtCapacity,
            format!("lock '{key}' is at capacity ({valid}); wait for a release or ask an admin"),
        );
    }
    Decision::allow()
}

/// Admission for deleting `token`.
///
/// The encoded owner and admins may always release; once the expiry has
/// passed, anyone may reclaim the token, so abandoned locks need no admin
/// intervention.
pub fn admit_token_delete(policy: &LockPolicy, token: &Token, pusher: &str, now: u64) -> Decision {
    if token.owned_by(pusher) || policy.is_admin(pusher) || token.is_expired(now) {
        return Decision::allow();
    }
    Decision::deny(
        Reason::NotOwner,
        format!(
            "not owner or admin of unexpired token '{}'; cannot release it",
            token.ref_name
        ),
    )
}

/// Protected-path check for one branch update.
///
/// For every policy key whose non-empty patterns match at least one changed
/// file, the pusher must hold a valid token under that key. `list_tokens`
/// is only consulted for keys that actually matched.
pub fn admit_branch_update<F>(
    policy: &LockPolicy,
    changed_files: &[String],
    pusher: &str,
    now: u64,
    mut list_tokens: F,
) -> Decision
where
    F: FnMut(&str) -> Vec<Token>,
{
    for (key, key_policy) in &policy.keys {
        if key_policy.patterns.is_empty() {
            continue;
        }
        let protected = GlobSet::compile(&key_policy.patterns);
        if !changed_files.iter().any(|file| protected.is_match(file)) {
            continue;
        }
        let held = list_tokens(key)
            .iter()
            .any(|token| token.is_valid(now) && token.owned_by(pusher));
        if !held {
            return Decision::deny(
                Reason::MissingLock,
                format!("protected paths for '{key}' changed without a held lock; acquire it before pushing"),
            );
        }
    }
    Decision::allow()
}

/// Evaluates every ref update of one push against the lock policy.
pub struct Enforcer<'repo> {
    repo: &'repo Repository,
    pusher: String,
    now: u64,
}

impl<'repo> Enforcer<'repo> {
    /// Create an enforcer for one hook invocation.
    pub fn new(repo: &'repo Repository, pusher: impl Into<String>, now: u64) -> Self {
        Self {
            repo,
            pusher: pusher.into(),
            now,
        }
    }

    /// The parseable tokens currently stored under `key`.
    ///
    /// Refs that do not follow the token shape are skipped so they can
    /// never consume a capacity slot.
    pub fn tokens_for_key(&self, key: &str) -> Vec<Token> {
        self.repo
            .refs_with_prefix(&format!("{LOCK_NAMESPACE}{key}/"))
            .iter()
            .filter_map(|name| Token::parse(name))
            .collect()
    }

    /// Evaluate one update.
    pub fn evaluate(&self, update: &RefUpdate) -> Result<Decision, Error> {
        match update.kind() {
            UpdateKind::LockToken => self.evaluate_lock_ref(update),
            UpdateKind::Branch => self.evaluate_branch(update),
            UpdateKind::Other => Ok(Decision::allow()),
        }
    }

    /// Evaluate all updates of a push, returning the rejections paired with
    /// their ref names.
    ///
    /// Every update is checked even after the first rejection: the hook
    /// writes nothing, so completeness is free and the pusher sees all
    /// unmet requirements at once.
    pub fn check_push(&self, updates: &[RefUpdate]) -> Result<Vec<(String, Decision)>, Error> {
        let mut rejections = Vec::new();
        for update in updates {
            let decision = self.evaluate(update)?;
            if !decision.allowed {
                log::debug!("rejecting {}: {}", update.name(), decision.message);
                rejections.push((update.name().to_string(), decision));
            }
        }
        Ok(rejections)
    }

    fn evaluate_lock_ref(&self, update: &RefUpdate) -> Result<Decision, Error> {
        match update {
            RefUpdate::Create { new, name } => {
                let Some(token) = Token::parse(name) else {
                    return Ok(Decision::deny(
                        Reason::MalformedToken,
                        format!("malformed lock ref '{name}'"),
                    ));
                };
                let policy = LockPolicy::load(self.repo, Some(new));
                let existing = self.tokens_for_key(&token.key);
                Ok(admit_token_create(&policy, &token.key, &existing, &self.pusher, self.now))
            }
            RefUpdate::Delete { name, .. } => match Token::parse(name) {
                Some(token) => {
                    let policy = LockPolicy::load(self.repo, None);
                    Ok(admit_token_delete(&policy, &token, &self.pusher, self.now))
                }
                // Junk under the namespace may always be cleaned up.
                None => Ok(Decision::allow()),
            },
            // Tokens are immutable once created; clients delete-and-recreate
            // to change expiry, so a plain update passes through untouched.
            RefUpdate::Update { .. } => Ok(Decision::allow()),
        }
    }

    fn evaluate_branch(&self, update: &RefUpdate) -> Result<Decision, Error> {
        let (policy, changed) = match update {
            RefUpdate::Update { old, new, .. } => {
                let policy = LockPolicy::load(self.repo, Some(new));
                let changed = self.repo.changed_between(&old.to_string(), &new.to_string())?;
                (policy, changed)
            }
            RefUpdate::Create { new, .. } => {
                // A new branch has no old tip; compare against the current
                // default branch so only genuinely new work is checked. In
                // an empty repository there is nothing protected yet.
                let policy = LockPolicy::load(self.repo, Some(new));
                let changed = self
                    .repo
                    .changed_between("HEAD", &new.to_string())
                    .unwrap_or_default();
                (policy, changed)
            }
            // Branch deletion changes no files; protected paths do not
            // block it.
            RefUpdate::Delete { .. } => return Ok(Decision::allow()),
        };

        Ok(admit_branch_update(
            &policy,
            &changed,
            &self.pusher,
            self.now,
            |key| self.tokens_for_key(key),
        ))
    }
}
