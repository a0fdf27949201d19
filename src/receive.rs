//! Server-side pre-receive hook entry point.
//!
//! Reads `<old> <new> <refname>` lines from stdin, routes lock-namespace
//! updates through token admission and branch updates through the
//! protected-path check, and exits non-zero when any update is rejected.
//! The hook performs no writes: a non-zero exit makes the server discard
//! the entire push transaction.

use std::io::Read;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use fence_core::identity;
use fence_core::repo::Repository;
use fence_lock::{Enforcer, RefUpdate};

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("fence-receive: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> anyhow::Result<bool> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    if input.trim().is_empty() {
        return Ok(true);
    }

    let updates = RefUpdate::parse_all(&input)?;
    let pusher = identity::pusher_identity();
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    log::debug!("checking {} update(s) pushed by '{pusher}'", updates.len());

    // git runs hooks with the repository as working directory.
    let repo = Repository::at(".");
    let enforcer = Enforcer::new(&repo, pusher, now);
    let rejections = enforcer.check_push(&updates)?;
    for (_ref_name, decision) in &rejections {
        eprintln!("fence-receive: {}", decision.message);
    }
    Ok(rejections.is_empty())
}
