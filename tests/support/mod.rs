//! Helpers for cross-process transport tests
//!
//! Each test forks real peer processes, mirroring how the transports are
//! used in production: the child runs its half of the exchange and exits
//! zero on success, and the parent asserts on the exit status.

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use std::panic::AssertUnwindSafe;

/// Base name unique to this test process, so parallel runs do not collide
pub fn unique_name(tag: &str) -> String {
    format!("msgport_it_{tag}_{}", std::process::id())
}

/// Run `child` in a forked process
///
/// The child exits 0 on success and nonzero on error or panic, so the
/// parent's [`expect_success`] assertion reports the failure.
pub fn spawn_child<F>(child: F) -> Pid
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match unsafe { fork() }.expect("fork failed") {
        ForkResult::Parent { child } => child,
        ForkResult::Child => {
            let code = match std::panic::catch_unwind(AssertUnwindSafe(child)) {
                Ok(Ok(())) => 0,
                Ok(Err(err)) => {
                    eprintln!("child error: {err:#}");
                    1
                }
                Err(_) => 2,
            };
            std::process::exit(code);
        }
    }
}

/// Wait for the forked child and assert it exited cleanly
pub fn expect_success(pid: Pid) {
    match waitpid(pid, None).expect("waitpid failed") {
        WaitStatus::Exited(_, 0) => {}
        status => panic!("child process failed: {status:?}"),
    }
}
