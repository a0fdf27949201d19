//! Flag files that changed after their dependent files went stale.
//!
//! The rule encodes "files matching `group_b` must not lag behind files
//! matching `group_a`": any group A file whose mtime exceeds the newest
//! group B mtime by more than `epsilon_ms` is an offender. The tolerance
//! absorbs filesystem timestamp coarseness and clock skew. A fresh clone
//! resets every mtime to checkout time, which collapses the signal; there
//! is no reliable way to detect that, so no special case is made.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use fence_core::glob::GlobSet;
use serde::Deserialize;

use crate::{Action, Annotation, Context, Rule, RuleError};

fn default_epsilon_ms() -> u64 {
    1500
}

fn default_only_tracked() -> bool {
    true
}

/// Options for [`MtimeCompare`].
#[derive(Debug, Clone, Deserialize)]
pub struct MtimeCompareOptions {
    /// Globs for the files expected to change, e.g. `["src/**"]`.
    pub group_a: Vec<String>,
    /// Globs for the dependent files that must keep up, e.g. a config file.
    pub group_b: Vec<String>,
    /// Tolerance in milliseconds before a group A file counts as newer.
    #[serde(default = "default_epsilon_ms")]
    pub epsilon_ms: u64,
    /// Restrict the comparison to tracked files (default) or walk the whole
    /// working directory.
    #[serde(default = "default_only_tracked")]
    pub only_tracked: bool,
    /// Report sink, defaults to blocking.
    #[serde(default)]
    pub action: Action,
}

/// Warns (or fails) when group A files are newer than every group B file
/// by more than the configured tolerance. Without any group B file the rule
/// passes silently: there is nothing to compare against.
pub struct MtimeCompare {
    group_a: GlobSet,
    group_b: GlobSet,
    epsilon_ms: u64,
    only_tracked: bool,
    action: Action,
}

impl MtimeCompare {
    /// Compile both glob sets from `options`.
    pub fn new(options: MtimeCompareOptions) -> Self {
        Self {
            group_a: GlobSet::compile(&options.group_a),
            group_b: GlobSet::compile(&options.group_b),
            epsilon_ms: options.epsilon_ms,
            only_tracked: options.only_tracked,
            action: options.action,
        }
    }
}

impl Rule for MtimeCompare {
    fn name(&self) -> &str {
        "mtime-compare"
    }

    fn run(&self, ctx: &mut Context) -> Result<(), RuleError> {
        let files = if self.only_tracked {
            ctx.repo().tracked_files()?
        } else {
            walk_files(ctx.repo().work_dir())
        };

        // Unreadable mtimes skip the file instead of failing the rule; a
        // transient filesystem race must not produce a false positive.
        let mut max_b: Option<u128> = None;
        for file in &files {
            if !self.group_b.is_match(file) {
                continue;
            }
            if let Some(ms) = mtime_millis(ctx, file) {
                max_b = Some(max_b.map_or(ms, |current| current.max(ms)));
            }
        }
        let Some(max_b) = max_b else {
            return Ok(());
        };

        let limit = max_b + u128::from(self.epsilon_ms);
        let newer: Vec<String> = files
            .iter()
            .filter(|file| self.group_a.is_match(file))
            .filter(|file| mtime_millis(ctx, file).is_some_and(|ms| ms > limit))
            .cloned()
            .collect();

        if !newer.is_empty() {
            let annotation = Annotation::new(self.name(), "group A files are newer than the newest group B file")
                .with_files(newer)
                .with_meta("max_b_epoch_ms", max_b.to_string())
                .with_meta("epsilon_ms", self.epsilon_ms.to_string());
            ctx.report(self.action, annotation);
        }
        Ok(())
    }
}

fn mtime_millis(ctx: &Context, file: &str) -> Option<u128> {
    let mtime = ctx.repo().mtime(file).ok()?;
    epoch_millis(mtime)
}

fn epoch_millis(time: SystemTime) -> Option<u128> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_millis())
}

fn walk_files(root: &Path) -> Vec<String> {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        })
        .collect()
}
