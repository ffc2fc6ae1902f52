//! The bg builtin.

use anyhow::Result;
use nix::sys::signal::Signal;

use crate::jobs::{JobManager, JobState};
use crate::output;
use crate::parser::CommandLine;
use crate::tools::{Flow, Tool};

use super::{find_job, parse_job_ref, signal_group};

/// Bg tool: continue a job in the background.
///
/// Prints the same launch notification as a command ending in `&`, built
/// from the job's stored command line.
pub struct Bg;

impl Tool for Bg {
    fn name(&self) -> &str {
        "bg"
    }

    fn run(&self, cmd: &CommandLine, jobs: &JobManager) -> Result<Flow> {
        if cmd.argv.len() != 2 {
            output::emit("bg please input one and only one ID argument\n");
            return Ok(Flow::Continue);
        }
        let arg = &cmd.argv[1];
        let Some(target) = parse_job_ref(arg) else {
            if arg.starts_with('%') {
                output::emit("bg: argument must be a %jobid\n");
            } else {
                output::emit("bg: argument must be a PID\n");
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
        job.state = JobState::Background;
        output::emit(format!("[{}] ({}) {}\n", job.id, job.pid, job.cmdline));
        Ok(Flow::Continue)
    }
}
