//! Lexer for command lines, built on the logos lexer generator.
//!
//! The grammar is deliberately small. Whitespace separates tokens; `<` and
//! `>` are redirection operators only at the start of a token; a token that
//! opens with a quote runs to the matching quote and may span whitespace.
//! Inside an ordinary word, quotes and redirection characters are plain
//! text, so `a<b` is one word while `a <b` redirects.

use std::fmt;

use logos::Logos;

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexError {
    #[default]
    UnexpectedCharacter,
    UnmatchedQuote(char),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter => write!(f, "Error: unexpected character"),
            LexError::UnmatchedQuote(c) => write!(f, "Error: unmatched {c}."),
        }
    }
}

impl std::error::Error for LexError {}

/// Tokens of a command line.
///
/// Word must not open with a quote or redirection character, but accepts
/// them freely after the first character; that keeps `<` and `>` special
/// only at token-start position.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("<")]
    RedirectIn,

    #[token(">")]
    RedirectOut,

    /// Quoted token, quotes stripped. May contain whitespace.
    #[regex(r"'[^']*'", lex_quoted)]
    #[regex(r#""[^"]*""#, lex_quoted)]
    Quoted(String),

    /// Bare word.
    #[regex(r#"[^ \t\r\n<>'"][^ \t\r\n]*"#, lex_word)]
    Word(String),
}

/// Strip the surrounding quotes. Both quote characters are one byte, so
/// byte slicing is safe here.
fn lex_quoted(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].to_string()
}

fn lex_word(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice().to_string()
}

/// Tokenize one command line. Stops at the first error.
///
/// A logos match failure can only happen at a quote with no closing mate,
/// so the raw error is refined by peeking at the offending character.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(line).spanned() {
        match result {
            Ok(token) => tokens.push(token),
            Err(err) => {
                let refined = match line[span.start..].chars().next() {
                    Some(c @ ('\'' | '"')) => LexError::UnmatchedQuote(c),
                    _ => err,
                };
                return Err(refined);
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_and_redirects_split_apart() {
        let tokens = tokenize("cat < in > out").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("cat".into()),
                Token::RedirectIn,
                Token::Word("in".into()),
                Token::RedirectOut,
                Token::Word("out".into()),
            ]
        );
    }

    #[test]
    fn redirect_binds_tightly_to_following_word() {
        let tokens = tokenize("cat <in").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("cat".into()),
                Token::RedirectIn,
                Token::Word("in".into()),
            ]
        );
    }

    #[test]
    fn redirect_chars_are_plain_inside_a_word() {
        let tokens = tokenize("a<b").unwrap();
        assert_eq!(tokens, vec![Token::Word("a<b".into())]);
    }

    #[test]
    fn quotes_span_whitespace() {
        let tokens = tokenize("echo 'a b  c'").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Word("echo".into()), Token::Quoted("a b  c".into())]
        );
    }

    #[test]
    fn double_quotes_keep_single_quotes_inside() {
        let tokens = tokenize(r#"echo "it's""#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Word("echo".into()), Token::Quoted("it's".into())]
        );
    }

    #[test]
    fn empty_quotes_produce_an_empty_token() {
        let tokens = tokenize("echo ''").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Word("echo".into()), Token::Quoted(String::new())]
        );
    }

    #[test]
    fn unmatched_quote_names_the_quote_character() {
        assert_eq!(tokenize("echo 'abc"), Err(LexError::UnmatchedQuote('\'')));
        assert_eq!(tokenize("echo \"abc"), Err(LexError::UnmatchedQuote('"')));
        assert_eq!(
            tokenize("echo 'abc").unwrap_err().to_string(),
            "Error: unmatched '."
        );
    }

    #[test]
    fn blank_input_lexes_to_nothing() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("   \t  ").unwrap(), vec![]);
    }
}
