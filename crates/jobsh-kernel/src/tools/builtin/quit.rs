//! The quit builtin.

use anyhow::Result;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

use crate::jobs::JobManager;
use crate::parser::CommandLine;
use crate::tools::{Flow, Tool};

use super::signal_group;

/// Quit tool: reap what can be reaped, then leave.
///
/// Stop reports still queued get an interrupt to the job's group; exit
/// and kill reports drop out of the table. Arguments and redirections on
/// the line are ignored; `quit` always quits.
pub struct Quit;

impl Tool for Quit {
    fn name(&self) -> &str {
        "quit"
    }

    fn run(&self, _cmd: &CommandLine, jobs: &JobManager) -> Result<Flow> {
        let mut table = jobs.lock();
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED)) {
                Ok(WaitStatus::Stopped(pid, _)) => signal_group(pid, Signal::SIGINT),
                Ok(WaitStatus::Exited(pid, _)) | Ok(WaitStatus::Signaled(pid, _, _)) => {
                    let _ = table.delete(pid);
                }
                Ok(WaitStatus::StillAlive) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        drop(table);
        Ok(Flow::Exit(0))
    }
}
