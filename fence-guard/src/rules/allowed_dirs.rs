//! Restrict staged files to an allow-list of directories.

use fence_core::glob::GlobSet;
use serde::Deserialize;

use crate::{Action, Annotation, Context, Rule, RuleError};

/// Options for [`AllowedDirs`].
#[derive(Debug, Clone, Deserialize)]
pub struct AllowedDirsOptions {
    /// Directory globs staged files must match, e.g. `["src/**", "!**/target/**"]`.
    pub allow: Vec<String>,
    /// Report sink, defaults to blocking.
    #[serde(default)]
    pub action: Action,
}

/// Fails (or warns) when any staged file falls outside the allowed
/// directory globs. With nothing staged the rule passes silently.
pub struct AllowedDirs {
    allow: GlobSet,
    action: Action,
}

impl AllowedDirs {
    /// Compile the allow set from `options`.
    pub fn new(options: AllowedDirsOptions) -> Self {
        Self {
            allow: GlobSet::compile(&options.allow),
            action: options.action,
        }
    }
}

impl Rule for AllowedDirs {
    fn name(&self) -> &str {
        "allowed-dirs"
    }

    fn run(&self, ctx: &mut Context) -> Result<(), RuleError> {
        let staged = ctx.repo().staged_files();
        if staged.is_empty() {
            return Ok(());
        }

        let outside: Vec<String> = staged
            .into_iter()
            .filter(|file| !self.allow.is_match(file))
            .collect();
        if !outside.is_empty() {
            let annotation = Annotation::new(self.name(), "staged files outside the allowed directories")
                .with_files(outside);
            ctx.report(self.action, annotation);
        }
        Ok(())
    }
}
