//! Failures of vocabulary construction, with the line and read mode that
//! produced them.

use std::path::PathBuf;

use thiserror::Error;

use crate::ReadMode;

/// Errors raised while building a vocabulary and embedding matrix.
///
/// Every variant is fatal: a partially built table is never returned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The embeddings file could not be opened or mapped.
    #[error("failed to read embeddings from {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A record source failed while streaming lines.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// No vector rows were found, so the dimensionality is undefined.
    #[error("embeddings file contained no vectors")]
    Empty,
    /// A vector component could not be parsed as a float.
    #[error(
        "line {line}: component {token:?} is not a number (read mode = {mode}); \
         check whether the embeddings file is binary"
    )]
    InvalidComponent {
        line: usize,
        token: String,
        mode: ReadMode,
    },
    /// A row has a different number of components than the first row.
    #[error(
        "line {line}: expected {expected} components but found {found} (read mode = {mode}); \
         check whether the embeddings file is binary"
    )]
    DimensionMismatch {
        line: usize,
        expected: usize,
        found: usize,
        mode: ReadMode,
    },
    /// A row carries a word but no vector.
    #[error(
        "line {line}: word {word:?} has no vector components (read mode = {mode}); \
         check whether the embeddings file is binary"
    )]
    MissingVector {
        line: usize,
        word: String,
        mode: ReadMode,
    },
    /// A record is not valid UTF-8 while reading in text mode.
    #[error(
        "line {line}: record is not valid UTF-8 (read mode = {mode}); \
         check whether the embeddings file is binary"
    )]
    InvalidEncoding { line: usize, mode: ReadMode },
    /// The vocabulary does not fit the `u32` index space.
    #[error("vocabulary exceeds {max} words")]
    VocabularyOverflow { max: usize },
}

impl LoadError {
    /// Returns `true` when the error usually means the read mode does not match the file.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(
            self,
            LoadError::InvalidComponent { .. }
                | LoadError::DimensionMismatch { .. }
                | LoadError::MissingVector { .. }
                | LoadError::InvalidEncoding { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mismatch_messages_name_the_mode() {
        let err = LoadError::InvalidComponent {
            line: 2,
            token: "abc".into(),
            mode: ReadMode::Binary,
        };
        assert!(err.is_format_mismatch());
        let message = err.to_string();
        assert!(message.contains("read mode = binary"), "{message}");
        assert!(message.contains("binary"));
    }

    #[test]
    fn io_and_empty_are_not_format_mismatches() {
        assert!(!LoadError::Empty.is_format_mismatch());
        let io = LoadError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!io.is_format_mismatch());
    }
}
