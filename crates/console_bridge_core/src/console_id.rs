//! `console:<messageIndex>:<paramIndex>` identifiers.
//!
//! Both indices are 1-based. The parameter index is only meaningful inside the
//! message it belongs to; it is not a backend handle.

use std::fmt;
use std::str::FromStr;

use crate::{ConsoleError, Result};

const PREFIX: &str = "console";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsoleId {
    pub message_index: u64,
    pub param_index: u64,
}

impl ConsoleId {
    pub fn new(message_index: u64, param_index: u64) -> Self {
        Self {
            message_index,
            param_index,
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let (message, param) =
            split_segments(input).ok_or_else(|| ConsoleError::MalformedId(input.to_string()))?;

        let message_index = message
            .parse::<u64>()
            .map_err(|_| ConsoleError::MalformedId(input.to_string()))?;
        let param_index = param
            .parse::<u64>()
            .map_err(|_| ConsoleError::MalformedId(input.to_string()))?;

        Ok(Self::new(message_index, param_index))
    }
}

impl fmt::Display for ConsoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}:{}:{}", self.message_index, self.param_index)
    }
}

impl FromStr for ConsoleId {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// True iff `input` is exactly `console:<digits>:<digits>`.
pub fn is_console_id(input: &str) -> bool {
    split_segments(input).is_some()
}

fn split_segments(input: &str) -> Option<(&str, &str)> {
    let mut segments = input.split(':');
    let prefix = segments.next()?;
    let message = segments.next()?;
    let param = segments.next()?;

    if segments.next().is_some() || prefix != PREFIX {
        return None;
    }
    if !is_digits(message) || !is_digits(param) {
        return None;
    }
    Some((message, param))
}

fn is_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
