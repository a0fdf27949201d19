//! Early warning for upstream commits by other authors touching watched
//! paths.
//!
//! Lists the commits that landed on the comparison ref since the local
//! branch diverged from it, and flags those by authors outside the allow
//! set whose changed files match the watch globs. This is a soft
//! merge-conflict heads-up, not a block on unrelated upstream work.

use std::collections::HashSet;

use fence_core::glob::GlobSet;
use serde::Deserialize;

use crate::{Action, Annotation, Context, Rule, RuleError};

/// Options for [`UpstreamConflict`].
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConflictOptions {
    /// Globs for the files to watch, e.g. `["packages/**"]`.
    pub watch: Vec<String>,
    /// Comparison ref; defaults to the tracked upstream, then `origin/main`.
    #[serde(default)]
    pub base_ref: Option<String>,
    /// Author emails whose commits never count as conflicts; defaults to
    /// the current user.
    #[serde(default)]
    pub allowed_authors: Vec<String>,
    /// Report sink, defaults to blocking.
    #[serde(default)]
    pub action: Action,
}

/// Flags upstream commits by other authors that touch watched files.
///
/// Passes silently when no comparison ref can be resolved, no merge base
/// exists, or nothing new landed upstream.
pub struct UpstreamConflict {
    watch: GlobSet,
    base_ref: Option<String>,
    allowed_authors: Vec<String>,
    action: Action,
}

impl UpstreamConflict {
    /// Compile the watch set from `options`.
    pub fn new(options: UpstreamConflictOptions) -> Self {
        Self {
            watch: GlobSet::compile(&options.watch),
            base_ref: options.base_ref,
            allowed_authors: options.allowed_authors,
            action: options.action,
        }
    }

    fn comparison_ref(&self, ctx: &Context) -> Option<String> {
        if let Some(base) = &self.base_ref {
            return Some(base.clone());
        }
        if let Some(upstream) = ctx.repo().upstream_ref() {
            return Some(upstream);
        }
        ctx.repo()
            .remote_branch_exists("origin/main")
            .then(|| "origin/main".to_string())
    }
}

impl Rule for UpstreamConflict {
    fn name(&self) -> &str {
        "upstream-conflict"
    }

    fn run(&self, ctx: &mut Context) -> Result<(), RuleError> {
        let Some(comparison) = self.comparison_ref(ctx) else {
            return Ok(());
        };
        let Some(base) = ctx.repo().merge_base("HEAD", &comparison) else {
            return Ok(());
        };
        let commits = ctx.repo().commits_exclusive(&base.to_string(), &comparison);
        if commits.is_empty() {
            return Ok(());
        }

        let allow: HashSet<String> = if self.allowed_authors.is_empty() {
            ctx.repo()
                .user_email()
                .map(|email| email.to_lowercase())
                .into_iter()
                .collect()
        } else {
            self.allowed_authors.iter().map(|a| a.to_lowercase()).collect()
        };

        let mut offender_count = 0usize;
        let mut files: Vec<String> = Vec::new();
        for commit in &commits {
            let author = ctx
                .repo()
                .commit_author_email(commit)
                .unwrap_or_default()
                .to_lowercase();
            if allow.contains(&author) {
                continue;
            }
            let touched: Vec<String> = ctx
                .repo()
                .commit_changed_files(commit)
                .into_iter()
                .filter(|file| self.watch.is_match(file))
                .collect();
            if touched.is_empty() {
                continue;
            }
            offender_count += 1;
            for file in touched {
                if !files.contains(&file) {
                    files.push(file);
                }
            }
        }

        if offender_count > 0 {
            let annotation = Annotation::new(
                self.name(),
                format!("commits by other authors on '{comparison}' touch watched files since the merge base"),
            )
            .with_files(files)
            .with_meta("upstream", comparison)
            .with_meta("count", offender_count.to_string());
            ctx.report(self.action, annotation);
        }
        Ok(())
    }
}
