//! Command-line tokenizer.
//!
//! Rules:
//! - leading whitespace is skipped
//! - `//` at the start of a token comments out the rest of the line
//! - a token starting with `"` is read verbatim up to the closing quote; an
//!   unterminated quote simply ends at end of input
//! - any other token runs to the next whitespace
//!
//! Tokens longer than [`MAX_TOKEN_LEN`] bytes are truncated, never rejected.

use crate::util::truncate_on_char_boundary;

/// Longest token kept, in bytes. Longer tokens are cut on a char boundary.
pub const MAX_TOKEN_LEN: usize = 256;

/// Most tokens [`tokenize`] will split a line into; the rest are ignored.
pub const MAX_ARGS: usize = 64;

/// Cursor over a command line, yielding one token at a time.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Unconsumed input, starting right after the last token returned.
    pub fn remainder(&self) -> &'a str {
        self.rest
    }

    /// Next token, or `None` at end of input.
    ///
    /// A quoted empty string (`""`) yields `Some("")`, so `None` is the only
    /// end-of-input signal.
    pub fn next_token(&mut self) -> Option<String> {
        loop {
            let trimmed = self.rest.trim_start();
            if let Some(after) = trimmed.strip_prefix("//") {
                self.rest = match after.find('\n') {
                    Some(i) => &after[i + 1..],
                    None => "",
                };
                continue;
            }
            self.rest = trimmed;
            break;
        }

        if self.rest.is_empty() {
            return None;
        }

        let raw = if let Some(after) = self.rest.strip_prefix('"') {
            match after.find('"') {
                Some(end) => {
                    self.rest = &after[end + 1..];
                    &after[..end]
                }
                None => {
                    self.rest = "";
                    after
                }
            }
        } else {
            let end = self
                .rest
                .find(char::is_whitespace)
                .unwrap_or(self.rest.len());
            let token = &self.rest[..end];
            self.rest = &self.rest[end..];
            token
        };

        let mut token = raw.to_string();
        truncate_on_char_boundary(&mut token, MAX_TOKEN_LEN);
        Some(token)
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_token()
    }
}

/// Split a whole line into at most [`MAX_ARGS`] tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    Tokenizer::new(line).take(MAX_ARGS).collect()
}

/// First token of `line` plus whatever follows it, untouched.
pub fn split_first(line: &str) -> Option<(String, &str)> {
    let mut tokens = Tokenizer::new(line);
    let first = tokens.next_token()?;
    Some((first, tokens.remainder()))
}
