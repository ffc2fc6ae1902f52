//! Signal handling on a dedicated thread.
//!
//! signal-hook's iterator turns asynchronous delivery into an ordinary
//! blocking loop: one named thread owns SIGCHLD, SIGINT, SIGTSTP and
//! SIGQUIT, and replays each against the job table under its lock.
//! Children run in their own process groups, so terminal keystrokes only
//! reach the shell; the thread relays them to the foreground group by
//! hand. Every table mutation ends with a condvar notify so a blocked
//! foreground wait re-checks its condition.

use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{killpg, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use signal_hook::consts::{SIGCHLD, SIGINT, SIGQUIT, SIGTSTP};
use signal_hook::iterator::Signals;
use tracing::debug;

use crate::jobs::{JobManager, JobState};
use crate::output;

/// Ignore the terminal-access stops. The shell shares the terminal with
/// its children instead of handing it over, so these must not suspend it.
pub fn install_terminal_ignores() -> Result<()> {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    unsafe {
        sigaction(Signal::SIGTTIN, &ignore).context("failed to ignore SIGTTIN")?;
        sigaction(Signal::SIGTTOU, &ignore).context("failed to ignore SIGTTOU")?;
    }
    Ok(())
}

/// Restore default dispositions in a freshly forked child. The signal
/// thread does not exist on this side of the fork, and the window before
/// exec must not swallow a relayed SIGINT or SIGTSTP.
pub fn reset_child_signals() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    unsafe {
        let _ = sigaction(Signal::SIGCHLD, &default);
        let _ = sigaction(Signal::SIGINT, &default);
        let _ = sigaction(Signal::SIGTSTP, &default);
    }
}

/// Start the thread that owns signal delivery. It runs for the life of
/// the shell.
pub fn spawn_signal_thread(jobs: JobManager) -> Result<JoinHandle<()>> {
    let mut signals = Signals::new([SIGCHLD, SIGINT, SIGTSTP, SIGQUIT])
        .context("failed to register signal handlers")?;
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for signal in signals.forever() {
                debug!(signal, "signal received");
                match signal {
                    SIGCHLD => reap_children(&jobs),
                    SIGINT => interrupt_foreground(&jobs),
                    SIGTSTP => stop_foreground(&jobs),
                    SIGQUIT => quit_on_request(),
                    _ => {}
                }
            }
        })
        .context("failed to spawn signal thread")
}

/// Drain every child the kernel has status for, without blocking.
///
/// Exits drop out of the table silently. Kills are reported and dropped.
/// Stops are reported unless the stop was already recorded, which happens
/// when the relay in [`stop_foreground`] got there first. Pids the table
/// does not know are reaped without comment. The whole drain runs under a
/// single hold of the table lock, so anything else that calls `waitpid`
/// under the lock sees a consistent set of statuses.
fn reap_children(jobs: &JobManager) {
    let mut table = jobs.lock();
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(pid, code)) => {
                if let Some(job) = table.delete(pid) {
                    debug!(pid = pid.as_raw(), id = %job.id, code, "child exited");
                }
            }
            Ok(WaitStatus::Signaled(pid, signal, _)) => {
                if let Some(job) = table.delete(pid) {
                    output::emit(format!(
                        "Job [{}] ({}) terminated by signal {}\n",
                        job.id,
                        job.pid,
                        signal as i32
                    ));
                }
            }
            Ok(WaitStatus::Stopped(pid, signal)) => {
                if let Some(job) = table.find_by_pid_mut(pid) {
                    if job.state != JobState::Stopped {
                        let line = format!(
                            "Job [{}] ({}) stopped by signal {}\n",
                            job.id,
                            job.pid,
                            signal as i32
                        );
                        job.state = JobState::Stopped;
                        output::emit(line);
                    }
                }
            }
            Ok(WaitStatus::StillAlive) => break,
            Ok(_) => continue,
            Err(Errno::ECHILD) => break,
            Err(Errno::EINTR) => continue,
            Err(err) => {
                debug!(error = %err, "waitpid failed");
                break;
            }
        }
    }
    drop(table);
    jobs.notify();
}

/// Relay Ctrl-C to the foreground process group. The table is untouched;
/// the reaper reports whatever becomes of the child.
fn interrupt_foreground(jobs: &JobManager) {
    let table = jobs.lock();
    if let Some(pid) = table.foreground_pid() {
        if let Err(err) = killpg(pid, Signal::SIGINT) {
            debug!(pid = pid.as_raw(), error = %err, "failed to interrupt foreground group");
        }
    }
}

/// Relay Ctrl-Z to the foreground process group. The stop is reported and
/// recorded here, ahead of the child actually stopping, so the prompt can
/// come back immediately; the reaper then sees the state already set and
/// stays quiet.
fn stop_foreground(jobs: &JobManager) {
    let mut table = jobs.lock();
    let Some(pid) = table.foreground_pid() else {
        return;
    };
    if let Some(job) = table.find_by_pid_mut(pid) {
        output::emit(format!(
            "Job [{}] ({}) stopped by signal {}\n",
            job.id,
            job.pid,
            Signal::SIGTSTP as i32
        ));
        job.state = JobState::Stopped;
    }
    if let Err(err) = killpg(pid, Signal::SIGTSTP) {
        debug!(pid = pid.as_raw(), error = %err, "failed to stop foreground group");
    }
    drop(table);
    jobs.notify();
}

/// A driver asking the shell to shut down sends SIGQUIT.
fn quit_on_request() {
    output::emit("Terminating after receipt of SIGQUIT signal\n");
    std::process::exit(1);
}
