//! Read-only repository inspection by driving the `git` binary.
//!
//! Every query is a thin wrapper over one `git` invocation with the working
//! directory threaded explicitly via `git -C`; nothing here relies on the
//! ambient process directory. Queries where absence is an expected outcome
//! (no upstream configured, no merge base, nothing staged) return `Option`
//! or an empty collection instead of an error.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use gix_hash::ObjectId;

/// Error type for inspector queries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Spawning `git` or reading a file failed at the OS level.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// `git` ran but exited with a non-zero status.
    #[error("git {args:?} exited with status {status}: {stderr}")]
    Command {
        /// The arguments passed to `git` (without `-C <dir>`).
        args: Vec<String>,
        /// The exit code, `-1` when terminated by a signal.
        status: i32,
        /// Trailing-trimmed stderr of the failed invocation.
        stderr: String,
    },
    /// `git` produced output that is not valid UTF-8.
    #[error("git produced non-UTF-8 output")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// A handle to a repository working directory for read-only queries.
#[derive(Debug, Clone)]
pub struct Repository {
    work_dir: PathBuf,
}

impl Repository {
    /// Create a handle for the repository at `work_dir`.
    ///
    /// This does no I/O and does not verify that a repository exists there;
    /// the first query will surface that.
    pub fn at(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// The working directory this handle queries.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn run(&self, args: &[&str]) -> Result<String, Error> {
        log::debug!("git -C {:?} {}", self.work_dir, args.join(" "));
        let mut full: Vec<OsString> = Vec::with_capacity(args.len() + 2);
        full.push("-C".into());
        full.push(self.work_dir.as_os_str().to_owned());
        full.extend(args.iter().map(OsString::from));

        let child = gix_command::prepare("git")
            .args(full)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::Command {
                args: args.iter().map(ToString::to_string).collect(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        Ok(String::from_utf8(output.stdout)?)
    }

    fn run_opt(&self, args: &[&str]) -> Option<String> {
        self.run(args).ok()
    }

    /// Files currently staged for commit, repo-relative with forward slashes.
    ///
    /// Failure (e.g. an empty repository without `HEAD`) yields the empty list.
    pub fn staged_files(&self) -> Vec<String> {
        self.run_opt(&["diff", "--name-only", "--cached"])
            .map(|out| lines(&out))
            .unwrap_or_default()
    }

    /// All tracked files, repo-relative with forward slashes.
    pub fn tracked_files(&self) -> Result<Vec<String>, Error> {
        let out = self.run(&["ls-files", "-z"])?;
        Ok(out
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(normalize)
            .collect())
    }

    /// Modification time of a tracked file given by repo-relative path.
    pub fn mtime(&self, rel_path: &str) -> Result<SystemTime, Error> {
        let meta = std::fs::metadata(self.work_dir.join(rel_path))?;
        Ok(meta.modified()?)
    }

    /// The merge base of two revisions, or `None` when they are unrelated.
    pub fn merge_base(&self, a: &str, b: &str) -> Option<ObjectId> {
        let out = self.run_opt(&["merge-base", a, b])?;
        ObjectId::from_hex(out.trim().as_bytes()).ok()
    }

    /// Commits reachable from `tip` but not from `ancestor`, merges excluded.
    ///
    /// Any failure (unknown revision, shallow history) yields the empty list.
    pub fn commits_exclusive(&self, ancestor: &str, tip: &str) -> Vec<ObjectId> {
        let range = format!("{ancestor}..{tip}");
        self.run_opt(&["rev-list", "--no-merges", &range])
            .map(|out| {
                out.lines()
                    .filter_map(|l| ObjectId::from_hex(l.trim().as_bytes()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The author email of a commit, or `None` when it cannot be read.
    pub fn commit_author_email(&self, id: &ObjectId) -> Option<String> {
        let out = self.run_opt(&["show", "-s", "--format=%ae", &id.to_string()])?;
        let email = out.trim();
        (!email.is_empty()).then(|| email.to_string())
    }

    /// The files changed by a single commit, relative to its parents.
    pub fn commit_changed_files(&self, id: &ObjectId) -> Vec<String> {
        let spec = format!("{id}^!");
        self.run_opt(&["diff", "--name-only", &spec])
            .map(|out| lines(&out))
            .unwrap_or_default()
    }

    /// The files changed between two revisions.
    ///
    /// Unlike the per-commit queries this is mandatory for its callers, so
    /// failure propagates.
    pub fn changed_between(&self, old: &str, new: &str) -> Result<Vec<String>, Error> {
        let range = format!("{old}..{new}");
        Ok(lines(&self.run(&["diff", "--name-only", &range])?))
    }

    /// Resolve a revision to its object id, or `None` when it does not exist.
    pub fn resolve(&self, rev: &str) -> Option<ObjectId> {
        let out = self.run_opt(&["rev-parse", "--verify", "--quiet", rev])?;
        ObjectId::from_hex(out.trim().as_bytes()).ok()
    }

    /// The configured `user.email`, or `None` when unset.
    pub fn user_email(&self) -> Option<String> {
        let out = self.run_opt(&["config", "user.email"])?;
        let email = out.trim();
        (!email.is_empty()).then(|| email.to_string())
    }

    /// The symbolic name of the tracked upstream ref, or `None` when no
    /// upstream is configured.
    pub fn upstream_ref(&self) -> Option<String> {
        let out = self.run_opt(&[
            "rev-parse",
            "--abbrev-ref",
            "--symbolic-full-name",
            "@{upstream}",
        ])?;
        let name = out.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Whether a remote-tracking branch like `origin/main` exists locally.
    pub fn remote_branch_exists(&self, name: &str) -> bool {
        let full = format!("refs/remotes/{name}");
        self.run_opt(&["rev-parse", "--verify", "--quiet", &full])
            .is_some()
    }

    /// All refs whose full name starts with `prefix`, in iteration order.
    pub fn refs_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.run_opt(&["for-each-ref", "--format=%(refname)", prefix])
            .map(|out| out.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
            .unwrap_or_default()
    }

    /// The contents of `rel_path` as stored in the tree of `rev`, or `None`
    /// when the revision or path does not exist.
    pub fn show_file(&self, rev: &str, rel_path: &str) -> Option<String> {
        let spec = format!("{rev}:{rel_path}");
        self.run_opt(&["show", &spec])
    }
}

fn lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(normalize)
        .collect()
}

fn normalize(path: impl AsRef<str>) -> String {
    path.as_ref().replace('\\', "/")
}
