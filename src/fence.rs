//! Client-side guard hook entry point.
//!
//! Runs the configured guard rules for one mode and reports findings:
//! warnings on stdout prefixed `WARN [<rule>]`, failures on stderr prefixed
//! `ERROR [<rule>]`, each followed by an indented file list. Exit codes:
//! `0` clean, `1` failures present, `2` configuration error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use fence_core::repo::Repository;
use fence_guard::{run_rules, Config, Mode, RunResult};

#[derive(Debug, Parser)]
#[command(name = "fence", version, about = "Guard checks for commits and pushes")]
struct Args {
    /// Hook phase to evaluate the rules for.
    #[arg(long, value_enum, default_value = "pre-commit")]
    mode: ModeArg,

    /// Repository working directory; defaults to the current directory.
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Explicit configuration path, overriding discovery.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install pre-commit and pre-push hook scripts invoking this binary.
    Install,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    PreCommit,
    PrePush,
    Manual,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PreCommit => Mode::PreCommit,
            ModeArg::PrePush => Mode::PrePush,
            ModeArg::Manual => Mode::Manual,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let cwd = args.cwd.clone().unwrap_or_else(|| PathBuf::from("."));

    if let Some(Command::Install) = args.command {
        return match install_hooks(&cwd) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("fence: {err:#}");
                ExitCode::from(2)
            }
        };
    }

    let config = match load_config(&cwd, args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fence: {err}");
            return ExitCode::from(2);
        }
    };

    let rules = config.into_rules();
    let result = run_rules(&rules, args.mode.into(), Repository::at(&cwd));
    report(&result);
    if result.is_blocking() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<Config, fence_guard::ConfigError> {
    match explicit {
        Some(path) => Config::load(&cwd.join(path)),
        None => Config::discover(cwd),
    }
}

fn report(result: &RunResult) {
    for warning in &result.warnings {
        println!("WARN [{}] {}", warning.name, warning.message);
        for file in &warning.files {
            println!("  - {file}");
        }
    }
    for failure in &result.failures {
        eprintln!("ERROR [{}] {}", failure.name, failure.message);
        for file in &failure.files {
            eprintln!("  - {file}");
        }
    }
}

fn install_hooks(cwd: &Path) -> anyhow::Result<()> {
    let hook_dir = cwd.join(".git").join("hooks");
    anyhow::ensure!(
        hook_dir.is_dir(),
        "no .git/hooks directory found under {cwd:?}; is this a git repository?"
    );
    for mode in ["pre-commit", "pre-push"] {
        let path = hook_dir.join(mode);
        if path.exists() {
            println!("hook exists: {mode} (skipped)");
            continue;
        }
        let script = format!("#!/usr/bin/env bash\nset -euo pipefail\nfence --mode {mode}\n");
        std::fs::write(&path, script).with_context(|| format!("writing {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .with_context(|| format!("marking {} executable", path.display()))?;
        }
        println!("hook installed: {mode}");
    }
    Ok(())
}
