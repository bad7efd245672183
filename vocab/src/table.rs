//! Vocabulary mapping and aligned embedding matrix produced by the builder.

use std::collections::HashMap;

use candle_core::{Device, Tensor};

/// Index reserved for padding; row 0 of every matrix.
pub const PADDING_INDEX: u32 = 0;

/// Dense row-major matrix of `rows x dims` f32 values.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    dims: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Wraps a flat buffer, returning `None` when its length is not `rows * dims`.
    pub fn from_flat(data: Vec<f32>, rows: usize, dims: usize) -> Option<Self> {
        (rows.checked_mul(dims)? == data.len()).then_some(Self { rows, dims, data })
    }

    /// Returns the number of rows, padding and unknown included.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the embedding dimensionality.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Returns row `index`, or `None` when it is out of range.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.dims;
        Some(&self.data[start..start + self.dims])
    }

    /// Iterates over rows in index order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dims.max(1)).take(self.rows)
    }

    /// Returns the row-major backing buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copies the matrix into a `[rows, dims]` tensor on `device`.
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor, candle_core::Error> {
        Tensor::from_vec(self.data.clone(), (self.rows, self.dims), device)
    }
}

/// Immutable word-to-index mapping plus the matrix whose rows those indices address.
///
/// Row 0 is padding, rows `1..=N` hold the file's vectors in file order and the
/// final row is the unknown-token vector.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingTable {
    word_to_idx: HashMap<String, u32>,
    matrix: EmbeddingMatrix,
    unknown_index: u32,
}

impl EmbeddingTable {
    /// Assembles a table, checking that every index addresses a word row of `matrix`.
    pub fn from_parts(word_to_idx: HashMap<String, u32>, matrix: EmbeddingMatrix) -> Option<Self> {
        if matrix.rows() < 2 {
            return None;
        }
        let unknown_index = u32::try_from(matrix.rows() - 1).ok()?;
        let in_range = word_to_idx
            .values()
            .all(|&idx| idx != PADDING_INDEX && idx < unknown_index);
        in_range.then_some(Self {
            word_to_idx,
            matrix,
            unknown_index,
        })
    }

    /// Returns the word-to-index mapping; padding and unknown have no entry.
    pub fn word_to_idx(&self) -> &HashMap<String, u32> {
        &self.word_to_idx
    }

    /// Returns the embedding matrix addressed by the table's indices.
    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    /// Index of the unknown-token row, always `matrix().rows() - 1`.
    pub fn unknown_index(&self) -> u32 {
        self.unknown_index
    }

    /// Returns the embedding dimensionality.
    pub fn embedding_size(&self) -> usize {
        self.matrix.dims()
    }

    /// Number of distinct words in the vocabulary.
    pub fn vocab_size(&self) -> usize {
        self.word_to_idx.len()
    }

    /// Returns the index of `word`, or `None` when it is not in the vocabulary.
    pub fn index_of(&self, word: &str) -> Option<u32> {
        self.word_to_idx.get(word).copied()
    }

    /// Returns the index for `word`, falling back to the unknown index.
    pub fn lookup(&self, word: &str) -> u32 {
        self.index_of(word).unwrap_or(self.unknown_index)
    }

    /// Embedding vector for `word`; unseen words get the unknown vector.
    pub fn embedding(&self, word: &str) -> &[f32] {
        let row = self.lookup(word) as usize;
        &self.matrix.as_slice()[row * self.matrix.dims()..(row + 1) * self.matrix.dims()]
    }

    /// Words ordered by row; padding, unknown and orphaned duplicate rows are `None`.
    pub fn words_by_index(&self) -> Vec<Option<&str>> {
        let mut words = vec![None; self.matrix.rows()];
        for (word, &idx) in &self.word_to_idx {
            words[idx as usize] = Some(word.as_str());
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> EmbeddingTable {
        let matrix = EmbeddingMatrix::from_flat(
            vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 2.0, 3.0],
            4,
            2,
        )
        .unwrap();
        let word_to_idx = HashMap::from([("the".to_string(), 1), ("cat".to_string(), 2)]);
        EmbeddingTable::from_parts(word_to_idx, matrix).unwrap()
    }

    #[test]
    fn matrix_rejects_mismatched_buffers() {
        assert!(EmbeddingMatrix::from_flat(vec![1.0; 5], 2, 3).is_none());
        let matrix = EmbeddingMatrix::from_flat(vec![1.0; 6], 2, 3).unwrap();
        assert_eq!(matrix.row(1), Some(&[1.0, 1.0, 1.0][..]));
        assert_eq!(matrix.row(2), None);
        assert_eq!(matrix.iter_rows().count(), 2);
    }

    #[test]
    fn unseen_words_use_the_unknown_row() {
        let table = sample_table();
        assert_eq!(table.unknown_index(), 3);
        assert_eq!(table.lookup("cat"), 2);
        assert_eq!(table.lookup("dog"), 3);
        assert_eq!(table.embedding("the"), &[1.0, 2.0]);
        assert_eq!(table.embedding("dog"), &[2.0, 3.0]);
        assert_eq!(table.embedding_size(), 2);
        assert_eq!(table.vocab_size(), 2);
    }

    #[test]
    fn reverse_vocabulary_leaves_reserved_rows_empty() {
        let table = sample_table();
        assert_eq!(
            table.words_by_index(),
            vec![None, Some("the"), Some("cat"), None]
        );
    }

    #[test]
    fn indices_must_address_word_rows() {
        let matrix = EmbeddingMatrix::from_flat(vec![0.0; 6], 3, 2).unwrap();
        let padding = HashMap::from([("pad".to_string(), PADDING_INDEX)]);
        assert!(EmbeddingTable::from_parts(padding, matrix.clone()).is_none());
        let unknown = HashMap::from([("unk".to_string(), 2)]);
        assert!(EmbeddingTable::from_parts(unknown, matrix).is_none());
    }

    #[test]
    fn matrix_converts_to_tensor() {
        let table = sample_table();
        let tensor = table.matrix().to_tensor(&Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[4, 2]);
        assert_eq!(tensor.to_vec2::<f32>().unwrap()[3], vec![2.0, 3.0]);
    }
}
