//! The fg builtin.

use anyhow::Result;
use nix::sys::signal::Signal;

use crate::jobs::{JobManager, JobState};
use crate::output;
use crate::parser::CommandLine;
use crate::tools::{Flow, Tool};

use super::{find_job, parse_job_ref, signal_group};

/// Fg tool: move a job to the foreground and wait for it to leave.
///
/// A stopped target is continued first. The wait ends when no job holds
/// the foreground any more, whichever job that turns out to be.
pub struct Fg;

impl Tool for Fg {
    fn name(&self) -> &str {
        "fg"
    }

    fn run(&self, cmd: &CommandLine, jobs: &JobManager) -> Result<Flow> {
        if cmd.argv.len() != 2 {
            output::emit("fg please input one and only one ID argument\n");
            return Ok(Flow::Continue);
        }
        let arg = &cmd.argv[1];
        let Some(target) = parse_job_ref(arg) else {
            if arg.starts_with('%') {
                output::emit("fg: argument must be a nonzero %jobid\n");
            } else {
                output::emit("fg: argument must be a nonzero PID\n");
            }
            return Ok(Flow::Continue);
        };

        let mut table = jobs.lock();
        let Some(job) = find_job(&mut table, target) else {
            return Ok(Flow::Continue);
        };
        if job.state == JobState::Stopped {
            signal_group(job.pid, Signal::SIGCONT);
        }
        job.state = JobState::Foreground;
        let table = jobs.wait_no_foreground(table);
        drop(table);
        Ok(Flow::Continue)
    }
}
