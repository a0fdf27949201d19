//! Integration tests for the repository inspector against throwaway
//! repositories created with the system `git`.

use std::path::Path;
use std::process::Command;

use fence_core::repo::Repository;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("git is available on the test machine");
    assert!(status.success(), "git {args:?} failed in {dir:?}");
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-q", "-b", "main"]);
    git(dir, &["config", "user.name", "Fence Test"]);
    git(dir, &["config", "user.email", "fence@example.com"]);
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn staged_tracked_and_identity_queries() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    write(tmp.path(), "src/a.rs", "fn a() {}\n");
    write(tmp.path(), "docs/readme.md", "# hello\n");
    git(tmp.path(), &["add", "-A"]);
    git(tmp.path(), &["commit", "-q", "-m", "initial"]);

    let repo = Repository::at(tmp.path());
    assert_eq!(
        repo.tracked_files().unwrap(),
        vec!["docs/readme.md".to_string(), "src/a.rs".to_string()]
    );
    assert!(repo.staged_files().is_empty());
    assert_eq!(repo.user_email().as_deref(), Some("fence@example.com"));
    assert_eq!(repo.upstream_ref(), None);
    assert!(!repo.remote_branch_exists("origin/main"));
    assert!(repo.mtime("src/a.rs").is_ok());

    write(tmp.path(), "src/b.rs", "fn b() {}\n");
    git(tmp.path(), &["add", "src/b.rs"]);
    assert_eq!(repo.staged_files(), vec!["src/b.rs".to_string()]);
}

#[test]
fn merge_base_exclusive_commits_and_commit_queries() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    write(tmp.path(), "base.txt", "base\n");
    git(tmp.path(), &["add", "-A"]);
    git(tmp.path(), &["commit", "-q", "-m", "base"]);
    git(tmp.path(), &["branch", "side"]);

    write(tmp.path(), "upstream.txt", "upstream change\n");
    git(tmp.path(), &["add", "-A"]);
    git(
        tmp.path(),
        &["-c", "user.email=other@example.com", "commit", "-q", "-m", "upstream"],
    );

    let repo = Repository::at(tmp.path());
    let base = repo.merge_base("side", "main");
    assert!(base.is_some(), "side branched from main");

    let exclusive = repo.commits_exclusive("side", "main");
    assert_eq!(exclusive.len(), 1, "one commit landed on main since side");
    let commit = &exclusive[0];
    assert_eq!(repo.commit_author_email(commit).as_deref(), Some("other@example.com"));
    assert_eq!(repo.commit_changed_files(commit), vec!["upstream.txt".to_string()]);

    let from = repo.merge_base("side", "main").unwrap();
    let changed = repo.changed_between(&from.to_string(), &commit.to_string()).unwrap();
    assert_eq!(changed, vec!["upstream.txt".to_string()]);

    assert_eq!(repo.resolve("main"), repo.resolve("HEAD"));
    assert_eq!(repo.resolve("no-such-rev"), None);

    assert!(repo.commits_exclusive("main", "side").is_empty());
    assert_eq!(repo.merge_base("main", "does-not-exist"), None);
}

#[test]
fn ref_listing_and_in_tree_reads() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    write(tmp.path(), "src/a.rs", "fn a() {}\n");
    git(tmp.path(), &["add", "-A"]);
    git(tmp.path(), &["commit", "-q", "-m", "initial"]);
    git(tmp.path(), &["update-ref", "refs/fence/sem/docs/alice@0/abc123", "HEAD"]);

    let repo = Repository::at(tmp.path());
    assert_eq!(
        repo.refs_with_prefix("refs/fence/sem/"),
        vec!["refs/fence/sem/docs/alice@0/abc123".to_string()]
    );
    assert!(repo.refs_with_prefix("refs/fence/other/").is_empty());

    assert_eq!(repo.show_file("HEAD", "src/a.rs").as_deref(), Some("fn a() {}\n"));
    assert_eq!(repo.show_file("HEAD", "missing.txt"), None);
}
