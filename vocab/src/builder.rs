//! One-pass construction of an [`EmbeddingTable`] from a word-vector file.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::source::{reader_records, VectorFile};
use crate::table::{EmbeddingMatrix, EmbeddingTable};
use crate::{LoadError, ReadMode};

/// Which rows contribute to the unknown-token vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMean {
    /// Mean over the padding row and every word row.
    #[default]
    IncludePadding,
    /// Mean over word rows only.
    WordsOnly,
}

/// Options controlling how a vector file is turned into a table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub read_mode: ReadMode,
    /// Maximum number of vocabulary rows to read.
    ///
    /// Only word rows count towards the limit, not physical lines. A header
    /// line is not counted, so `Some(n)` yields `n` words whether or not the
    /// file has a header; a line-based limit would yield `n - 1` for headered
    /// files.
    pub max_words: Option<usize>,
    /// Seed for the padding row. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub unknown_mean: UnknownMean,
}

/// Builds vocabularies and embedding matrices from word-vector files.
#[derive(Clone, Debug, Default)]
pub struct VocabularyBuilder {
    config: BuilderConfig,
}

impl VocabularyBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Returns the options this builder was created with.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Reads the file at `path` in a single pass and releases it before returning.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), mode = %self.config.read_mode))]
    pub fn build<P: AsRef<Path>>(&self, path: P) -> Result<EmbeddingTable, LoadError> {
        let started = Instant::now();
        let file = VectorFile::open(path.as_ref())?;
        let table = self.build_from_records(file.records())?;
        info!(
            vocab_size = table.vocab_size(),
            embedding_size = table.embedding_size(),
            unknown_index = table.unknown_index(),
            bytes = file.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "embeddings loaded",
        );
        Ok(table)
    }

    /// Builds from a buffered reader, e.g. a decompressed or remote stream.
    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<EmbeddingTable, LoadError> {
        self.build_from_records(reader_records(reader))
    }

    /// Builds from an iterator of raw records, one per line of the source file.
    pub fn build_from_records<I, R>(&self, records: I) -> Result<EmbeddingTable, LoadError>
    where
        I: IntoIterator<Item = Result<R, LoadError>>,
        R: AsRef<[u8]>,
    {
        let mode = self.config.read_mode;
        let mut word_to_idx: HashMap<String, u32> = HashMap::new();
        // Row 0 is reserved for padding once the dimensionality is known.
        let mut data: Vec<f32> = Vec::new();
        let mut row: Vec<f32> = Vec::new();
        let mut dims: Option<usize> = None;
        let mut word_rows = 0usize;
        let mut duplicates = 0usize;

        for (position, record) in records.into_iter().enumerate() {
            if self.config.max_words.is_some_and(|limit| word_rows >= limit) {
                break;
            }
            let record = record?;
            let line = position + 1;
            let text = mode.decode(line, record.as_ref())?;
            let mut tokens = text.split_whitespace();
            let Some(word) = tokens.next() else {
                continue;
            };

            // Only the very first physical line can be a `<count> <dims>` header.
            if position == 0 && tokens.clone().count() == 1 {
                debug!(line, "skipping header record");
                continue;
            }

            row.clear();
            for token in tokens {
                let value = token
                    .parse::<f32>()
                    .map_err(|_| LoadError::InvalidComponent {
                        line,
                        token: token.to_string(),
                        mode,
                    })?;
                row.push(value);
            }

            match dims {
                _ if row.is_empty() => {
                    return Err(LoadError::MissingVector {
                        line,
                        word: word.to_string(),
                        mode,
                    });
                }
                None => {
                    dims = Some(row.len());
                    data.resize(row.len(), 0.0);
                }
                Some(expected) if expected != row.len() => {
                    return Err(LoadError::DimensionMismatch {
                        line,
                        expected,
                        found: row.len(),
                        mode,
                    });
                }
                Some(_) => {}
            }

            // The unknown row takes the index after the last word.
            let index = u32::try_from(word_rows + 1)
                .ok()
                .filter(|index| *index < u32::MAX)
                .ok_or(LoadError::VocabularyOverflow {
                    max: u32::MAX as usize - 1,
                })?;
            word_rows += 1;
            data.extend_from_slice(&row);
            if word_to_idx.insert(word.to_string(), index).is_some() {
                duplicates += 1;
            }
        }

        let dims = dims.ok_or(LoadError::Empty)?;
        if duplicates > 0 {
            warn!(
                duplicates,
                "duplicate words in embeddings file, later rows take precedence"
            );
        }

        self.fill_padding(&mut data[..dims]);
        let unknown = self.unknown_row(&data, dims);
        data.extend(unknown);

        let matrix = EmbeddingMatrix::from_flat(data, word_rows + 2, dims)
            .ok_or(LoadError::Empty)?;
        EmbeddingTable::from_parts(word_to_idx, matrix).ok_or(LoadError::Empty)
    }

    fn fill_padding(&self, padding: &mut [f32]) {
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        for value in padding.iter_mut() {
            *value = StandardNormal.sample(&mut rng);
        }
    }

    fn unknown_row(&self, data: &[f32], dims: usize) -> Vec<f32> {
        let skip = match self.config.unknown_mean {
            UnknownMean::IncludePadding => 0,
            UnknownMean::WordsOnly => 1,
        };
        let mut sums = vec![0.0f64; dims];
        let mut count = 0usize;
        for row in data.chunks_exact(dims).skip(skip) {
            for (sum, value) in sums.iter_mut().zip(row) {
                *sum += f64::from(*value);
            }
            count += 1;
        }
        sums.into_iter()
            .map(|sum| (sum / count as f64) as f32)
            .collect()
    }
}
