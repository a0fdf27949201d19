//! Ordered rule execution with aggregated results.

use fence_core::repo::Repository;

use crate::{Annotation, Context, Mode, Rule};

/// The aggregated outcome of one guard run.
///
/// The run is blocking iff `failures` is non-empty, independent of how many
/// warnings were collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Non-blocking findings.
    pub warnings: Vec<Annotation>,
    /// Blocking findings.
    pub failures: Vec<Annotation>,
}

impl RunResult {
    /// Whether the invoking hook should exit non-zero.
    pub fn is_blocking(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Run `rules` strictly in list order against one shared context.
///
/// Each rule gets its own error boundary: an `Err` from rule `R` appends a
/// failure named after `R` and execution continues with the next rule, so
/// one broken rule cannot mask the findings of the others.
pub fn run_rules(rules: &[Box<dyn Rule>], mode: Mode, repo: Repository) -> RunResult {
    let mut ctx = Context::new(mode, repo);
    for rule in rules {
        log::debug!("running rule '{}'", rule.name());
        if let Err(err) = rule.run(&mut ctx) {
            ctx.fail(Annotation::new(rule.name(), err.to_string()));
        }
    }
    ctx.into_result()
}
