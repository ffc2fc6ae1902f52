//! Builtin command dispatch.
//!
//! Every builtin implements the same [`Tool`] trait and lives in a
//! [`ToolRegistry`] keyed by command name. The dispatcher looks argv[0]
//! up in the registry; a hit runs on the shell's own thread, a miss is
//! forked and exec'd as an external program.

mod builtin;
mod registry;
mod traits;

pub use builtin::register_builtins;
pub use registry::ToolRegistry;
pub use traits::{Flow, Tool};
