//! Decoding of raw vector-file records according to the configured read mode.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::LoadError;

/// How the bytes of a word-vector file are turned into text before splitting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Every record must be valid UTF-8.
    #[default]
    Text,
    /// Records are decoded lossily; invalid sequences become U+FFFD.
    Binary,
}

impl ReadMode {
    /// Maps the conventional `is_binary_embedding` flag onto a read mode.
    pub fn from_binary_flag(is_binary: bool) -> Self {
        if is_binary {
            ReadMode::Binary
        } else {
            ReadMode::Text
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(self, ReadMode::Binary)
    }

    /// Decodes a single record. `line` is 1-based and only used for errors.
    pub(crate) fn decode(self, line: usize, record: &[u8]) -> Result<Cow<'_, str>, LoadError> {
        match self {
            ReadMode::Text => std::str::from_utf8(record)
                .map(Cow::Borrowed)
                .map_err(|_| LoadError::InvalidEncoding { line, mode: self }),
            ReadMode::Binary => Ok(String::from_utf8_lossy(record)),
        }
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMode::Text => f.write_str("text"),
            ReadMode::Binary => f.write_str("binary"),
        }
    }
}
