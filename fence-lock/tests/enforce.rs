//! End-to-end enforcement tests over a real repository: policy document in
//! the tree, tokens as refs, pushes simulated as pre-receive stdin lines.

use std::path::Path;
use std::process::Command;

use fence_core::repo::Repository;
use fence_lock::{Enforcer, Reason, RefUpdate};

const ZERO: &str = "0000000000000000000000000000000000000000";
const NOW: u64 = 1_000;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("git is available on the test machine");
    assert!(status.success(), "git {args:?} failed in {dir:?}");
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

const POLICY: &str = r#"{
    "admins": ["root"],
    "keys": {
        "docs": { "capacity": 1, "ttlSeconds": 0, "patterns": ["docs/**"] }
    }
}
"#;

/// Two commits: the first introduces the policy and a protected file, the
/// second modifies the protected file. Returns `(old, new)` hex ids for a
/// simulated `refs/heads/main` update.
fn fixture(dir: &Path) -> (String, String) {
    git(dir, &["init", "-q", "-b", "main"]);
    git(dir, &["config", "user.name", "Fence Test"]);
    git(dir, &["config", "user.email", "fence@example.com"]);

    write(dir, ".fence/lock-policy.json", POLICY);
    write(dir, "docs/guide.md", "guide\n");
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", "policy and docs"]);

    write(dir, "docs/guide.md", "guide v2\n");
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", "touch docs"]);

    let repo = Repository::at(dir);
    let old = repo.resolve("HEAD~1").unwrap().to_string();
    let new = repo.resolve("HEAD").unwrap().to_string();
    (old, new)
}

fn acquire_token(dir: &Path, ref_name: &str) {
    git(dir, &["update-ref", ref_name, "HEAD"]);
}

#[test]
fn branch_push_touching_protected_paths_needs_a_held_lock() {
    let tmp = tempfile::tempdir().unwrap();
    let (old, new) = fixture(tmp.path());
    let repo = Repository::at(tmp.path());

    let updates = RefUpdate::parse_all(&format!("{old} {new} refs/heads/main\n")).unwrap();

    let enforcer = Enforcer::new(&repo, "alice", NOW);
    let rejections = enforcer.check_push(&updates).unwrap();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].0, "refs/heads/main");
    assert_eq!(rejections[0].1.reason, Reason::MissingLock);
    assert!(rejections[0].1.message.contains("docs"));

    acquire_token(tmp.path(), "refs/fence/sem/docs/alice@0/n1");
    let rejections = enforcer.check_push(&updates).unwrap();
    assert!(rejections.is_empty(), "a held token admits the push");

    // The token belongs to alice; bob still cannot push.
    let bob = Enforcer::new(&repo, "bob", NOW);
    let rejections = bob.check_push(&updates).unwrap();
    assert_eq!(rejections.len(), 1);
}

#[test]
fn unprotected_changes_pass_without_any_token() {
    let tmp = tempfile::tempdir().unwrap();
    git(tmp.path(), &["init", "-q", "-b", "main"]);
    git(tmp.path(), &["config", "user.name", "Fence Test"]);
    git(tmp.path(), &["config", "user.email", "fence@example.com"]);
    write(tmp.path(), ".fence/lock-policy.json", POLICY);
    write(tmp.path(), "src/lib.rs", "\n");
    git(tmp.path(), &["add", "-A"]);
    git(tmp.path(), &["commit", "-q", "-m", "initial"]);
    write(tmp.path(), "src/lib.rs", "pub fn f() {}\n");
    git(tmp.path(), &["add", "-A"]);
    git(tmp.path(), &["commit", "-q", "-m", "touch src"]);

    let repo = Repository::at(tmp.path());
    let old = repo.resolve("HEAD~1").unwrap().to_string();
    let new = repo.resolve("HEAD").unwrap().to_string();
    let updates = RefUpdate::parse_all(&format!("{old} {new} refs/heads/main\n")).unwrap();

    let enforcer = Enforcer::new(&repo, "alice", NOW);
    assert!(enforcer.check_push(&updates).unwrap().is_empty());
}

#[test]
fn token_creation_is_capacity_bounded_with_admin_override() {
    let tmp = tempfile::tempdir().unwrap();
    let (_old, new) = fixture(tmp.path());
    let repo = Repository::at(tmp.path());

    acquire_token(tmp.path(), "refs/fence/sem/docs/alice@0/n1");
    let creation =
        RefUpdate::parse_all(&format!("{ZERO} {new} refs/fence/sem/docs/bob@0/n2\n")).unwrap();

    let bob = Enforcer::new(&repo, "bob", NOW);
    let rejections = bob.check_push(&creation).unwrap();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].1.reason, Reason::AtCapacity);

    let root = Enforcer::new(&repo, "root", NOW);
    assert!(root.check_push(&creation).unwrap().is_empty(), "admins bypass capacity");
}

#[test]
fn expired_tokens_can_be_reclaimed_by_anyone() {
    let tmp = tempfile::tempdir().unwrap();
    let (_old, new) = fixture(tmp.path());
    let repo = Repository::at(tmp.path());

    acquire_token(tmp.path(), "refs/fence/sem/docs/carol@10/n3");
    let deletion =
        RefUpdate::parse_all(&format!("{new} {ZERO} refs/fence/sem/docs/carol@10/n3\n")).unwrap();

    let bob = Enforcer::new(&repo, "bob", NOW);
    assert!(bob.check_push(&deletion).unwrap().is_empty(), "expired at now=1000");

    // A live token stays protected from strangers.
    acquire_token(tmp.path(), "refs/fence/sem/docs/alice@0/n1");
    let deletion =
        RefUpdate::parse_all(&format!("{new} {ZERO} refs/fence/sem/docs/alice@0/n1\n")).unwrap();
    let rejections = bob.check_push(&deletion).unwrap();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].1.reason, Reason::NotOwner);

    let alice = Enforcer::new(&repo, "alice", NOW);
    assert!(alice.check_push(&deletion).unwrap().is_empty(), "owners release freely");
}

#[test]
fn expired_capacity_slot_frees_up_after_reclaim() {
    let tmp = tempfile::tempdir().unwrap();
    let (_old, new) = fixture(tmp.path());
    let repo = Repository::at(tmp.path());

    acquire_token(tmp.path(), "refs/fence/sem/docs/carol@10/n3");
    let creation =
        RefUpdate::parse_all(&format!("{ZERO} {new} refs/fence/sem/docs/bob@0/n2\n")).unwrap();

    // The expired token no longer counts against capacity even before it is
    // deleted.
    let bob = Enforcer::new(&repo, "bob", NOW);
    assert!(bob.check_push(&creation).unwrap().is_empty());
}

#[test]
fn malformed_lock_refs_are_rejected_at_creation_and_ignored_in_listings() {
    let tmp = tempfile::tempdir().unwrap();
    let (_old, new) = fixture(tmp.path());
    let repo = Repository::at(tmp.path());

    let creation =
        RefUpdate::parse_all(&format!("{ZERO} {new} refs/fence/sem/docs/strange\n")).unwrap();
    let enforcer = Enforcer::new(&repo, "alice", NOW);
    let rejections = enforcer.check_push(&creation).unwrap();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].1.reason, Reason::MalformedToken);

    // A malformed ref that somehow exists neither holds nor blocks a slot.
    git(tmp.path(), &["update-ref", "refs/fence/sem/docs/junk", "HEAD"]);
    assert!(enforcer.tokens_for_key("docs").is_empty());
}

#[test]
fn non_branch_non_lock_refs_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let (old, new) = fixture(tmp.path());
    let repo = Repository::at(tmp.path());

    let updates = RefUpdate::parse_all(&format!("{old} {new} refs/tags/v1\n")).unwrap();
    let enforcer = Enforcer::new(&repo, "alice", NOW);
    assert!(enforcer.check_push(&updates).unwrap().is_empty());
}
