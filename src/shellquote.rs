// src/shellquote.rs

//! POSIX shell quoting for command lines handed to the shell.
//!
//! [`quote`] turns an argument vector into a single string that `sh -c`
//! parses back into exactly those words. This is what lets the CLI accept
//! a raw argv and still run it through the shell.

use regex::Regex;
use thiserror::Error;

/// Errors for tokens no quoting can make safe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("no way to quote string containing null bytes")]
    Nul,
}

/// Quote `tokens` into one shell word list.
///
/// Tokens made only of `[0-9A-Za-z_!%+,./:=@^-]` pass through bare, except
/// that a token containing `=` is still quoted while nothing but
/// `=`-carrying tokens has been seen, so the shell reads leading
/// `KEY=VALUE` pairs as words rather than assignments. Everything else is
/// wrapped in single quotes with embedded quotes rendered as `'\''`, runs
/// of those collapsed into a double-quoted block, and a redundant leading
/// or trailing `''` removed.
pub fn quote<S: AsRef<str>>(tokens: &[S]) -> Result<String, QuoteError> {
    let needs_quoting = Regex::new(r"[^0-9A-Za-z_!%+,\-./:=@^]").unwrap();
    let quote_runs = Regex::new(r"(?:'\\''){2,}").unwrap();

    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut saw_plain_word = false;
    for token in tokens {
        let token = token.as_ref();
        if token.is_empty() {
            out.push("''".to_string());
            continue;
        }
        if token.contains('\0') {
            return Err(QuoteError::Nul);
        }

        let mut escape = false;
        if !saw_plain_word {
            if token.contains('=') {
                escape = true;
            } else {
                saw_plain_word = true;
            }
        }
        if !escape {
            escape = needs_quoting.is_match(token);
        }
        if !escape {
            out.push(token.to_string());
            continue;
        }

        let escaped = token.replace('\'', r"'\''");
        let collapsed = quote_runs.replace_all(&escaped, |caps: &regex::Captures| {
            format!("'\"{}\"'", "'".repeat(caps[0].len() / 4))
        });
        let mut quoted = format!("'{collapsed}'");
        if let Some(stripped) = quoted.strip_prefix("''") {
            quoted = stripped.to_string();
        }
        if let Some(stripped) = quoted.strip_suffix("''") {
            quoted = stripped.to_string();
        }
        out.push(quoted);
    }
    Ok(out.join(" "))
}
