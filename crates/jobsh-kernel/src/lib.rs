//! jobsh-kernel: the core of jobsh.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes command lines using logos
//! - **Parser**: Builds a [`CommandLine`] from tokens
//! - **Jobs**: Fixed-size job table plus the shared, lock-guarded handle to it
//! - **Kernel**: Line evaluation, builtin dispatch, fork/exec of external programs
//! - **Signals**: Dedicated thread that reaps children and relays terminal keystrokes
//! - **Tools**: Tool trait, registry, and builtin commands
//! - **Output**: Raw fd writers shared by the shell and its forked children

pub mod jobs;
pub mod kernel;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod signals;
pub mod tools;

pub use jobs::{Job, JobId, JobManager, JobState, JobTable, MAX_JOBS};
pub use kernel::Kernel;
pub use parser::{CommandLine, ParseError, MAX_ARGS};
pub use signals::{install_terminal_ignores, spawn_signal_thread};
pub use tools::{Flow, Tool, ToolRegistry};
