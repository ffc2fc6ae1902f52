//! Builtin commands.

mod bg;
mod fg;
mod jobs;
mod quit;

pub use bg::Bg;
pub use fg::Fg;
pub use jobs::Jobs;
pub use quit::Quit;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::debug;

use crate::jobs::{Job, JobId, JobTable};
use crate::output;
use crate::tools::ToolRegistry;

/// Register every builtin with the registry.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(Box::new(Quit));
    registry.register(Box::new(Jobs));
    registry.register(Box::new(Fg));
    registry.register(Box::new(Bg));
}

/// A job designator as typed: `%n` selects by job id, a bare integer by
/// process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobRef {
    Id(i32),
    Pid(i32),
}

/// Parse the operand of `fg`/`bg`. `None` covers everything malformed:
/// not an integer, or zero.
fn parse_job_ref(arg: &str) -> Option<JobRef> {
    if let Some(rest) = arg.strip_prefix('%') {
        match rest.parse::<i32>() {
            Ok(id) if id != 0 => Some(JobRef::Id(id)),
            _ => None,
        }
    } else {
        match arg.parse::<i32>() {
            Ok(pid) if pid != 0 => Some(JobRef::Pid(pid)),
            _ => None,
        }
    }
}

/// Look the target up in the table, reporting a miss to the user. The
/// existence check runs before any dereference, so a stale or negative
/// designator is an error message rather than a crash.
fn find_job(table: &mut JobTable, target: JobRef) -> Option<&mut Job> {
    match target {
        JobRef::Id(id) => {
            if id > 0 && table.find_by_id(JobId(id as u32)).is_some() {
                return table.find_by_id_mut(JobId(id as u32));
            }
            output::emit(format!("[{id}]: job with this jid do not exist\n"));
            None
        }
        JobRef::Pid(raw) => {
            let pid = Pid::from_raw(raw);
            if table.find_by_pid(pid).is_some() {
                return table.find_by_pid_mut(pid);
            }
            output::emit(format!("({raw}): process with this pid do not exist\n"));
            None
        }
    }
}

/// Signal a job's whole process group, logging delivery failures.
fn signal_group(pid: Pid, signal: Signal) {
    if let Err(err) = killpg(pid, signal) {
        debug!(pid = pid.as_raw(), %signal, error = %err, "failed to signal job group");
    }
}
