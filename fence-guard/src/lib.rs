//! Guard rules for pre-commit and pre-push hooks.
//!
//! A guard rule is a named predicate evaluated against repository state; it
//! reports findings as warnings (visible, never blocking) or failures
//! (blocking: the hook exits non-zero). Rules are executed strictly in
//! configuration order by [`engine::run_rules`], and an error raised by one
//! rule becomes a failure entry without aborting the rules after it.

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod rules;

use std::collections::BTreeMap;

use fence_core::repo::Repository;

pub use config::{Config, ConfigError};
pub use engine::{run_rules, RunResult};

/// The hook phase a guard run is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Invoked from a pre-commit hook.
    PreCommit,
    /// Invoked from a pre-push hook.
    PrePush,
    /// Invoked directly by a user.
    Manual,
}

impl Mode {
    /// The flag spelling of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::PreCommit => "pre-commit",
            Mode::PrePush => "pre-push",
            Mode::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-commit" => Ok(Mode::PreCommit),
            "pre-push" => Ok(Mode::PrePush),
            "manual" => Ok(Mode::Manual),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// Whether a rule reports its findings as blocking failures or as warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Report to the warning sink; the run still passes.
    Warn,
    /// Report to the failure sink; the run exits non-zero.
    #[default]
    Error,
}

/// A single finding reported by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Name of the reporting rule.
    pub name: String,
    /// Human-readable description of the finding.
    pub message: String,
    /// Offending files, repo-relative with forward slashes.
    pub files: Vec<String>,
    /// Additional key/value details for diagnostics.
    pub meta: BTreeMap<String, String>,
}

impl Annotation {
    /// Create an annotation with no files or metadata attached.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            files: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Attach the offending file list.
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Attach one metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Per-run state shared by all rules: the mode, the repository under
/// inspection, and the two reporting sinks.
///
/// Calling [`Context::fail`] marks the run as failed but does not stop the
/// rules that follow.
pub struct Context {
    mode: Mode,
    repo: Repository,
    warnings: Vec<Annotation>,
    failures: Vec<Annotation>,
}

impl Context {
    /// Create a fresh context for one run.
    pub fn new(mode: Mode, repo: Repository) -> Self {
        Self {
            mode,
            repo,
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// The mode this run was invoked for.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The repository inspector for this run's working directory.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Record a non-blocking warning.
    pub fn warn(&mut self, annotation: Annotation) {
        self.warnings.push(annotation);
    }

    /// Record a blocking failure.
    pub fn fail(&mut self, annotation: Annotation) {
        self.failures.push(annotation);
    }

    /// Record through the sink selected by `action`.
    pub fn report(&mut self, action: Action, annotation: Annotation) {
        match action {
            Action::Warn => self.warn(annotation),
            Action::Error => self.fail(annotation),
        }
    }

    fn into_result(self) -> RunResult {
        RunResult {
            warnings: self.warnings,
            failures: self.failures,
        }
    }
}

/// Error raised by a rule when a query it cannot do without fails.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A mandatory repository query failed.
    #[error(transparent)]
    Inspect(#[from] fence_core::repo::Error),
    /// Any other rule-specific failure.
    #[error("{0}")]
    Message(String),
}

/// A named guard predicate evaluated against repository state.
///
/// Implementations must not retain the context beyond one `run` call; the
/// engine converts a returned error into a failure entry named after the
/// rule.
pub trait Rule {
    /// Stable rule name used in report prefixes.
    fn name(&self) -> &str;

    /// Evaluate the rule, reporting findings through `ctx`.
    fn run(&self, ctx: &mut Context) -> Result<(), RuleError>;
}
