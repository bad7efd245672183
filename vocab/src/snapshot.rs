//! Persisting built tables as a safetensors matrix plus a plain-text vocabulary.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use bytemuck::{cast_slice, pod_collect_to_vec};
use candle_core::{Device, Tensor};
use safetensors::tensor::TensorView;
use safetensors::{SafeTensorError, SafeTensors, serialize};
use thiserror::Error;

use crate::table::{EmbeddingMatrix, EmbeddingTable};

const TENSOR_NAME: &str = "embeddings";
const MATRIX_FILE: &str = "embeddings.safetensors";
const VOCAB_FILE: &str = "vocab.txt";
const UNKNOWN_INDEX_KEY: &str = "unknown_index";
const EMBEDDING_SIZE_KEY: &str = "embedding_size";

/// Errors that can occur while reading or writing table snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("safetensors error: {0}")]
    SafeTensors(#[from] SafeTensorError),
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
    /// Raised when the stored matrix is not two dimensional or has too few rows.
    #[error("embedding tensor must be two dimensional with at least two rows")]
    InvalidShape,
    #[error("expected f32 tensor but found {0:?}")]
    InvalidDType(safetensors::Dtype),
    /// Raised when the metadata disagrees with the stored matrix.
    #[error("snapshot metadata {key} is missing or inconsistent")]
    InvalidMetadata { key: &'static str },
    /// Raised when the vocabulary file does not line up with the matrix rows.
    #[error("vocabulary lists {found} rows but the matrix has {expected} word rows")]
    VocabularyMismatch { expected: usize, found: usize },
}

/// Snapshot of an [`EmbeddingTable`] laid out for reloading without reparsing.
///
/// `vocab.txt` holds one line per word row (rows `1..=N`); orphaned rows left
/// behind by duplicate words are written as empty lines.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingSnapshot {
    rows: usize,
    dims: usize,
    data: Vec<f32>,
    words: Vec<Option<String>>,
}

impl EmbeddingSnapshot {
    /// Captures the state of a built table.
    pub fn capture(table: &EmbeddingTable) -> Self {
        let matrix = table.matrix();
        let by_index = table.words_by_index();
        let words = by_index[1..by_index.len() - 1]
            .iter()
            .map(|word| word.map(str::to_string))
            .collect();
        Self {
            rows: matrix.rows(),
            dims: matrix.dims(),
            data: matrix.as_slice().to_vec(),
            words,
        }
    }

    /// Rebuilds the table captured by this snapshot.
    pub fn into_table(self) -> Result<EmbeddingTable, SnapshotError> {
        let word_to_idx: HashMap<String, u32> = self
            .words
            .into_iter()
            .enumerate()
            .filter_map(|(row, word)| Some((word?, row as u32 + 1)))
            .collect();
        let matrix = EmbeddingMatrix::from_flat(self.data, self.rows, self.dims)
            .ok_or(SnapshotError::InvalidShape)?;
        EmbeddingTable::from_parts(word_to_idx, matrix).ok_or(SnapshotError::InvalidShape)
    }

    /// Restores the matrix into a tensor located on the supplied device.
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor, candle_core::Error> {
        Tensor::from_vec(self.data.clone(), (self.rows, self.dims), device)
    }

    /// Writes `embeddings.safetensors` and `vocab.txt` into `dir`.
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<(), SnapshotError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let tensor_view = TensorView::new(
            safetensors::Dtype::F32,
            vec![self.rows, self.dims],
            cast_slice(self.data.as_slice()),
        )?;
        let metadata = HashMap::from([
            (UNKNOWN_INDEX_KEY.to_string(), (self.rows - 1).to_string()),
            (EMBEDDING_SIZE_KEY.to_string(), self.dims.to_string()),
        ]);
        let serialized = serialize(
            std::iter::once((TENSOR_NAME.to_string(), tensor_view)),
            &Some(metadata),
        )?;
        File::create(dir.join(MATRIX_FILE))?.write_all(&serialized)?;

        let mut vocab = String::new();
        for word in &self.words {
            vocab.push_str(word.as_deref().unwrap_or_default());
            vocab.push('\n');
        }
        fs::write(dir.join(VOCAB_FILE), vocab)?;
        Ok(())
    }

    /// Reads a snapshot previously written with [`EmbeddingSnapshot::write`].
    pub fn read<P: AsRef<Path>>(dir: P) -> Result<Self, SnapshotError> {
        let dir = dir.as_ref();
        let mut bytes = Vec::new();
        File::open(dir.join(MATRIX_FILE))?.read_to_end(&mut bytes)?;

        let (_, header) = SafeTensors::read_metadata(&bytes)?;
        let tensors = SafeTensors::deserialize(&bytes)?;
        let tensor = tensors.tensor(TENSOR_NAME)?;
        if tensor.dtype() != safetensors::Dtype::F32 {
            return Err(SnapshotError::InvalidDType(tensor.dtype()));
        }
        let shape = tensor.shape();
        if shape.len() != 2 || shape[0] < 2 {
            return Err(SnapshotError::InvalidShape);
        }
        let rows = shape[0];
        let dims = shape[1];

        let metadata = header.metadata().clone().unwrap_or_default();
        let check = |key: &'static str, expected: usize| {
            match metadata.get(key).and_then(|value| value.parse::<usize>().ok()) {
                Some(value) if value == expected => Ok(()),
                _ => Err(SnapshotError::InvalidMetadata { key }),
            }
        };
        check(UNKNOWN_INDEX_KEY, rows - 1)?;
        check(EMBEDDING_SIZE_KEY, dims)?;

        let data = pod_collect_to_vec::<u8, f32>(tensor.data());
        let vocab = fs::read_to_string(dir.join(VOCAB_FILE))?;
        let words: Vec<Option<String>> = vocab
            .lines()
            .map(|line| (!line.is_empty()).then(|| line.to_string()))
            .collect();
        if words.len() != rows - 2 {
            return Err(SnapshotError::VocabularyMismatch {
                expected: rows - 2,
                found: words.len(),
            });
        }
        Ok(Self {
            rows,
            dims,
            data,
            words,
        })
    }

    /// Returns the number of stored rows, padding and unknown included.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the embedding dimensionality.
    pub fn dims(&self) -> usize {
        self.dims
    }
}
