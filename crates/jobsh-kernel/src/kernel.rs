//! The dispatcher at the center of the shell.
//!
//! [`Kernel::eval`] takes one command line and either runs a builtin on
//! the calling thread or forks an external program into its own process
//! group. The fork, the job registration, and the launch notification all
//! happen under the table lock, so the signal thread can never reap a
//! child the table has not registered yet.

use std::ffi::CString;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::libc;
use nix::sys::stat::{umask, Mode};
use nix::unistd::{close, dup2, execv, fork, setpgid, ForkResult, Pid};
use tracing::debug;

use crate::jobs::{JobManager, JobState};
use crate::output;
use crate::parser::{parse_line, CommandLine};
use crate::signals;
use crate::tools::{register_builtins, Flow, ToolRegistry};

pub struct Kernel {
    jobs: JobManager,
    tools: ToolRegistry,
}

impl Kernel {
    pub fn new(jobs: JobManager) -> Self {
        let mut tools = ToolRegistry::new();
        register_builtins(&mut tools);
        Self { jobs, tools }
    }

    /// Evaluate one command line.
    ///
    /// The line ends at its first NUL byte; whatever follows is dropped.
    /// Parse errors and operand mistakes are reported to the user and
    /// resolve to [`Flow::Continue`]; `Err` means the shell itself can no
    /// longer run.
    pub fn eval(&self, line: &str) -> Result<Flow> {
        let line = match line.find('\0') {
            Some(end) => &line[..end],
            None => line,
        };
        let cmd = match parse_line(line) {
            Ok(cmd) => cmd,
            Err(err) => {
                output::emit_err(format!("{err}\n"));
                return Ok(Flow::Continue);
            }
        };
        let Some(program) = cmd.argv.first() else {
            return Ok(Flow::Continue);
        };
        if let Some(tool) = self.tools.get(program) {
            debug!(tool = %program, "running builtin");
            return tool.run(&cmd, &self.jobs);
        }
        self.spawn(&cmd, line)?;
        Ok(Flow::Continue)
    }

    /// Fork and exec an external program.
    ///
    /// Everything the child needs is prepared before the fork. The child
    /// must not allocate or touch the table lock: another thread may hold
    /// either at the moment of the fork, and the child inherits them
    /// locked forever.
    fn spawn(&self, cmd: &CommandLine, line: &str) -> Result<()> {
        let program = cstring(&cmd.argv[0])?;
        let argv = cmd
            .argv
            .iter()
            .map(|arg| cstring(arg))
            .collect::<Result<Vec<_>>>()?;
        let infile = cmd.infile.as_deref().map(cstring).transpose()?;
        let outfile = cmd.outfile.as_deref().map(cstring).transpose()?;
        let not_found = format!("{}: Command not found.\n", cmd.argv[0]);

        let mut table = self.jobs.lock();
        match unsafe { fork() }.context("fork failed")? {
            ForkResult::Child => {
                let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                signals::reset_child_signals();
                if let Some(path) = &infile {
                    match open(path.as_c_str(), OFlag::O_RDONLY, Mode::empty()) {
                        Ok(fd) => {
                            if let Err(err) = dup2(fd, libc::STDIN_FILENO) {
                                child_fail(b"Dup2 error: ", err);
                            }
                            let _ = close(fd);
                        }
                        Err(err) => child_fail(b"Open error: ", err),
                    }
                }
                if let Some(path) = &outfile {
                    umask(Mode::from_bits_truncate(0o022));
                    let flags = OFlag::O_CREAT | OFlag::O_TRUNC | OFlag::O_WRONLY;
                    match open(path.as_c_str(), flags, Mode::from_bits_truncate(0o666)) {
                        Ok(fd) => {
                            if let Err(err) = dup2(fd, libc::STDOUT_FILENO) {
                                child_fail(b"Dup2 error: ", err);
                            }
                            let _ = close(fd);
                        }
                        Err(err) => child_fail(b"Open error: ", err),
                    }
                }
                let _ = execv(&program, &argv);
                let _ = output::write_all(output::stdout(), not_found.as_bytes());
                unsafe { libc::_exit(0) }
            }
            ForkResult::Parent { child } => {
                let state = if cmd.background {
                    JobState::Background
                } else {
                    JobState::Foreground
                };
                match table.add(child, state, line) {
                    Some(id) => {
                        debug!(pid = child.as_raw(), %id, cmdline = line, "added job");
                        if cmd.background {
                            output::emit(format!("[{id}] ({child}) {line}\n"));
                            drop(table);
                        } else {
                            let table = self.jobs.wait_foreground(table, child);
                            drop(table);
                        }
                    }
                    None => {
                        output::emit("Tried to create too many jobs\n");
                        if cmd.background {
                            output::emit(format!("[0] ({child}) {line}\n"));
                        }
                        drop(table);
                    }
                }
                Ok(())
            }
        }
    }
}

fn cstring(s: &str) -> Result<CString> {
    CString::new(s).context("command line contains a NUL byte")
}

/// Report a syscall failure from the forked child and bail out. Only
/// stack buffers and static strings on this side of the fork.
fn child_fail(prefix: &[u8], err: Errno) -> ! {
    let _ = output::write_parts(output::stdout(), &[prefix, err.desc().as_bytes(), b"\n"]);
    unsafe { libc::_exit(1) }
}
