//! jobsh entry point.
//!
//! Usage:
//!   jobsh          # interactive shell
//!   jobsh -v       # with diagnostic logging
//!   jobsh -p       # without a prompt (for test drivers)

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use nix::libc;
use nix::unistd::dup2;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobsh_kernel::{install_terminal_ignores, spawn_signal_thread, JobManager, Kernel};
use jobsh_repl::Repl;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("jobsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<i32> {
    // Diagnostics share stdout so a driver reading one pipe sees everything.
    dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO)
        .context("failed to redirect stderr to stdout")?;

    let mut verbose = false;
    let mut emit_prompt = true;
    for arg in env::args().skip(1) {
        let Some(flags) = arg.strip_prefix('-') else {
            return usage();
        };
        for flag in flags.chars() {
            match flag {
                'h' => return usage(),
                'v' => verbose = true,
                'p' => emit_prompt = false,
                _ => return usage(),
            }
        }
    }

    // Initialize tracing (respects RUST_LOG env var)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "jobsh_kernel=debug,jobsh_repl=debug"
        } else {
            "warn"
        })
    });
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    install_terminal_ignores()?;
    let jobs = JobManager::new();
    spawn_signal_thread(jobs.clone())?;
    let kernel = Kernel::new(jobs);

    Repl::new(kernel, emit_prompt).run()
}

fn usage() -> Result<i32> {
    println!("Usage: jobsh [-hvp]");
    println!("   -h   print this message");
    println!("   -v   print additional diagnostic information");
    println!("   -p   do not emit a command prompt");
    Ok(1)
}
