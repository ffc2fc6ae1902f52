//! The jobs builtin.

use std::os::fd::{AsFd, FromRawFd, OwnedFd};

use anyhow::Result;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::{umask, Mode};

use crate::jobs::{Job, JobManager};
use crate::output;
use crate::parser::CommandLine;
use crate::tools::{Flow, Tool};

/// Jobs tool: list every tracked job, one row per slot in slot order.
///
/// With `> file` on the line the listing is created fresh at that path
/// instead of going to stdout. The table lock is held for the whole
/// listing so no state-change notification can land between rows.
pub struct Jobs;

impl Tool for Jobs {
    fn name(&self) -> &str {
        "jobs"
    }

    fn run(&self, cmd: &CommandLine, jobs: &JobManager) -> Result<Flow> {
        let table = jobs.lock();
        if let Some(path) = cmd.outfile.as_deref() {
            umask(Mode::from_bits_truncate(0o022));
            let fd = match open(
                path,
                OFlag::O_CREAT | OFlag::O_TRUNC | OFlag::O_WRONLY,
                Mode::from_bits_truncate(0o666),
            ) {
                Ok(raw) => unsafe { OwnedFd::from_raw_fd(raw) },
                Err(err) => {
                    output::emit(format!("Open error: {}\n", err.desc()));
                    std::process::exit(1);
                }
            };
            for job in table.iter() {
                write_row(&fd, job);
            }
        } else {
            for job in table.iter() {
                write_row(output::stdout(), job);
            }
        }
        Ok(Flow::Continue)
    }
}

/// One listing row, written whole so a torn row can never appear.
fn write_row<Fd: AsFd>(fd: Fd, job: &Job) {
    let row = format!(
        "[{}] ({}) {:<11}{}\n",
        job.id, job.pid, job.state, job.cmdline
    );
    if output::write_all(fd, row.as_bytes()).is_err() {
        output::emit_err("Error writing to output file\n");
        std::process::exit(1);
    }
}
