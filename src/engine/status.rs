//! Flat status codes for callers that cannot carry a rich error

use crate::utils::{InlineError, Result};
use std::fmt;

/// Outcome of an inlining call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InlineStatus {
    Ok = 0,
    IoError = 1,
    MissingStylesheet = 2,
    InvalidUrl = 3,
    InvalidCacheSize = 4,
    ParseError = 5,
}

impl InlineStatus {
    /// Status of a finished call
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => InlineStatus::Ok,
            Err(err) => err.into(),
        }
    }

    /// Numeric code, stable across releases
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == InlineStatus::Ok
    }
}

impl From<&InlineError> for InlineStatus {
    fn from(err: &InlineError) -> Self {
        match err {
            InlineError::Io(_) => InlineStatus::IoError,
            InlineError::MissingStylesheet { .. } => InlineStatus::MissingStylesheet,
            InlineError::InvalidUrl { .. } => InlineStatus::InvalidUrl,
            InlineError::InvalidCacheSize(_) => InlineStatus::InvalidCacheSize,
            InlineError::Parse(_) => InlineStatus::ParseError,
        }
    }
}

impl fmt::Display for InlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InlineStatus::Ok => "ok",
            InlineStatus::IoError => "io error",
            InlineStatus::MissingStylesheet => "missing stylesheet",
            InlineStatus::InvalidUrl => "invalid url",
            InlineStatus::InvalidCacheSize => "invalid cache size",
            InlineStatus::ParseError => "parse error",
        };
        f.write_str(name)
    }
}
