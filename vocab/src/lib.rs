//! Vocabulary and embedding-matrix construction from pretrained word-vector files.
//!
//! [`VocabularyBuilder`] parses files of `word v1 ... vK` lines into an
//! [`EmbeddingTable`]: a contiguous word-to-index mapping starting at 1 and a
//! matrix with a random padding row at index 0 and a mean "unknown" row at the end.

mod builder;
mod error;
mod read_mode;
pub mod snapshot;
pub mod source;
mod table;

pub use builder::{BuilderConfig, UnknownMean, VocabularyBuilder};
pub use error::LoadError;
pub use read_mode::ReadMode;
pub use snapshot::{EmbeddingSnapshot, SnapshotError};
pub use source::VectorFile;
pub use table::{EmbeddingMatrix, EmbeddingTable, PADDING_INDEX};
