/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Stateless parsing and formatting of `data-words` lists.
//!
//! A message table file carries packet payloads as a comma-delimited string
//! (`"0,1,2,0x0A"`).  These are free functions so they can be used and tested
//! independently of the `MessageTable`.

use thiserror::Error;

/// Why a `data-words` string could not be turned into payload words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordsError {
    /// Two delimiters in a row, or a leading/trailing delimiter.
    #[error("empty token at word position {position}")]
    EmptyToken { position: usize },

    /// The token is not a decimal or `0x`-prefixed hexadecimal integer.
    #[error("malformed token '{token}' at word position {position}")]
    Malformed { position: usize, token: String },

    /// The token parsed but does not fit in 16 bits.
    #[error("word {value} at position {position} does not fit in 16 bits")]
    OutOfRange { position: usize, value: u64 },

    /// More words than the packet buffer can hold.
    #[error("{count} data words exceed the {max}-word payload capacity")]
    TooMany { count: usize, max: usize },
}

/// Parse a delimited word list into an ordered sequence of 16-bit words.
///
/// * An empty (or all-whitespace) string yields an empty list.
/// * Whitespace around tokens is ignored.
/// * Every malformed token is an error; nothing is silently truncated.
pub fn parse_data_words(text: &str, max_words: usize) -> Result<Vec<u16>, WordsError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let words = text
        .split(',')
        .enumerate()
        .map(|(position, raw)| parse_word(position, raw.trim()))
        .collect::<Result<Vec<u16>, WordsError>>()?;

    if words.len() > max_words {
        return Err(WordsError::TooMany {
            count: words.len(),
            max: max_words,
        });
    }
    Ok(words)
}

/// Format words as the comma-delimited decimal list accepted by
/// [`parse_data_words`].
pub fn format_data_words(words: &[u16]) -> String {
    words
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_word(position: usize, token: &str) -> Result<u16, WordsError> {
    if token.is_empty() {
        return Err(WordsError::EmptyToken { position });
    }

    let parsed = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => token.parse::<u64>(),
    };

    let value = parsed.map_err(|_| WordsError::Malformed {
        position,
        token: token.to_string(),
    })?;

    u16::try_from(value).map_err(|_| WordsError::OutOfRange { position, value })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
