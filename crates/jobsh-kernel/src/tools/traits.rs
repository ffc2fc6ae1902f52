//! The trait every builtin implements.

use anyhow::Result;

use crate::jobs::JobManager;
use crate::parser::CommandLine;

/// What the read loop should do after a command line finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading command lines.
    Continue,
    /// Stop reading and exit the shell with this status.
    Exit(i32),
}

/// A builtin command.
///
/// Tools run on the dispatch thread. Operand mistakes (bad job ids,
/// wrong argument counts) are reported to the user and end in
/// `Ok(Flow::Continue)`; `Err` is reserved for failures of the shell
/// itself.
pub trait Tool: Send + Sync {
    /// The command name the tool answers to as argv[0].
    fn name(&self) -> &str;

    /// Run against a parsed command line.
    fn run(&self, cmd: &CommandLine, jobs: &JobManager) -> Result<Flow>;
}
