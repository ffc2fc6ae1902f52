//! Parser from token stream to a runnable [`CommandLine`].
//!
//! The shape is a single command with optional `< infile`, `> outfile`,
//! and a trailing `&`. No pipes, no sequencing. Redirection is a small
//! state machine: each `<` or `>` arms an expectation that the next
//! word-like token satisfies.

use thiserror::Error;

use crate::lexer::{tokenize, LexError, Token};

/// Upper bound on argv entries. Parsing stops quietly once the list is
/// full; the rest of the line is ignored.
pub const MAX_ARGS: usize = 128;

/// One parsed command line, ready for dispatch or spawn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandLine {
    pub argv: Vec<String>,
    pub infile: Option<String>,
    pub outfile: Option<String>,
    /// True when the line ended with a token starting with `&`.
    pub background: bool,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A second redirection of a kind already satisfied, or `<` and `>`
    /// both waiting on the same filename.
    #[error("Error: Ambiguous I/O redirection")]
    AmbiguousRedirect,

    /// The line ended while a redirection was still waiting for its
    /// filename.
    #[error("Error: must provide file name for redirection")]
    MissingRedirectTarget,

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// Parse one command line.
///
/// An empty or all-whitespace line parses successfully to an empty argv;
/// callers treat that as "nothing to do". A line consisting only of `&`
/// does the same after the background marker is stripped.
pub fn parse_line(line: &str) -> Result<CommandLine, ParseError> {
    let mut cmd = CommandLine::default();
    let mut pending_in = false;
    let mut pending_out = false;

    for token in tokenize(line)? {
        match token {
            Token::RedirectIn => {
                if cmd.infile.is_some() {
                    return Err(ParseError::AmbiguousRedirect);
                }
                pending_in = true;
            }
            Token::RedirectOut => {
                if cmd.outfile.is_some() {
                    return Err(ParseError::AmbiguousRedirect);
                }
                pending_out = true;
            }
            Token::Word(word) | Token::Quoted(word) => {
                match (pending_in, pending_out) {
                    (false, false) => cmd.argv.push(word),
                    (true, false) => cmd.infile = Some(word),
                    (false, true) => cmd.outfile = Some(word),
                    (true, true) => return Err(ParseError::AmbiguousRedirect),
                }
                pending_in = false;
                pending_out = false;
                if cmd.argv.len() >= MAX_ARGS - 1 {
                    break;
                }
            }
        }
    }

    if pending_in || pending_out {
        return Err(ParseError::MissingRedirectTarget);
    }

    // A last token opening with `&` marks the whole line background and
    // is dropped, whatever follows the `&`.
    if cmd.argv.last().is_some_and(|arg| arg.starts_with('&')) {
        cmd.argv.pop();
        cmd.background = true;
    }

    Ok(cmd)
}
