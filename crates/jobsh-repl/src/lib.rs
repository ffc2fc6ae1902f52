//! jobsh REPL: the read loop around the kernel.
//!
//! Two front ends share one evaluation path:
//! - a tty gets rustyline line editing with history via `directories`
//! - anything else (pipes, drivers, scripts) gets plain buffered reads,
//!   with the prompt still written before every read unless suppressed
//!
//! End of input prints one newline and ends the shell with status 0. A
//! final line with no newline is treated as end of input, not a command.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use jobsh_kernel::{Flow, Kernel};

pub const PROMPT: &str = "jobsh> ";

pub struct Repl {
    kernel: Kernel,
    emit_prompt: bool,
}

impl Repl {
    pub fn new(kernel: Kernel, emit_prompt: bool) -> Self {
        Self {
            kernel,
            emit_prompt,
        }
    }

    /// Read and evaluate command lines until `quit`, end of input, or a
    /// failure of the shell itself. Returns the exit status.
    pub fn run(&self) -> Result<i32> {
        if io::stdin().is_terminal() {
            self.run_interactive()
        } else {
            self.run_piped()
        }
    }

    fn run_interactive(&self) -> Result<i32> {
        let mut rl: Editor<(), DefaultHistory> =
            Editor::new().context("failed to create line editor")?;

        let history_path = directories::BaseDirs::new()
            .map(|dirs| dirs.data_dir().join("jobsh").join("history.txt"));
        if let Some(path) = &history_path {
            if let Err(err) = rl.load_history(path) {
                // Missing history is expected on first run
                let not_found = matches!(&err, ReadlineError::Io(io_err)
                    if io_err.kind() == io::ErrorKind::NotFound);
                if !not_found {
                    tracing::warn!("failed to load history: {err}");
                }
            }
        }

        let prompt = if self.emit_prompt { PROMPT } else { "" };
        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    if let Err(err) = rl.add_history_entry(line.as_str()) {
                        tracing::warn!("failed to add history entry: {err}");
                    }
                    if let Flow::Exit(code) = self.kernel.eval(&line)? {
                        save_history(&mut rl, &history_path);
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    save_history(&mut rl, &history_path);
                    return Ok(0);
                }
                Err(err) => return Err(err).context("failed to read command line"),
            }
        }
    }

    fn run_piped(&self) -> Result<i32> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut line = String::new();
        loop {
            if self.emit_prompt {
                print!("{PROMPT}");
                io::stdout().flush().context("failed to flush prompt")?;
            }
            line.clear();
            let n = input
                .read_line(&mut line)
                .context("failed to read command line")?;
            if n == 0 {
                println!();
                return Ok(0);
            }
            let Some(stripped) = line.strip_suffix('\n') else {
                // Input ended mid-line; treat it like end of input.
                println!();
                return Ok(0);
            };
            if let Flow::Exit(code) = self.kernel.eval(stripped)? {
                return Ok(code);
            }
        }
    }
}

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Option<PathBuf>) {
    if let Some(path) = history_path {
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!("failed to create history directory: {err}");
            }
        }
        if let Err(err) = rl.save_history(path) {
            tracing::warn!("failed to save history: {err}");
        }
    }
}
