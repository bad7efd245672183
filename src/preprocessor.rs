use std::path::Path;
use std::sync::Arc;

use embedding_adapter::{AdapterConfig, EmbeddedModel, EmbeddingLayerAdapter, Model};
use text_encoder::{TextEncoder, Tokenizer};
use vocab::{BuilderConfig, EmbeddingTable, LoadError, VocabularyBuilder};

/// Owns a loaded embedding table and hands out encoders and wrapped models over it.
#[derive(Clone, Debug)]
pub struct TextPreprocessor {
    table: Arc<EmbeddingTable>,
}

impl TextPreprocessor {
    /// Loads the word-vector file at `path`.
    pub fn load<P: AsRef<Path>>(path: P, config: BuilderConfig) -> Result<Self, LoadError> {
        let table = VocabularyBuilder::new(config).build(path)?;
        Ok(Self::from_table(table))
    }

    pub fn from_table(table: EmbeddingTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &Arc<EmbeddingTable> {
        &self.table
    }

    pub fn unknown_index(&self) -> u32 {
        self.table.unknown_index()
    }

    pub fn embedding_size(&self) -> usize {
        self.table.embedding_size()
    }

    /// Text-to-indices transform for the training input pipeline.
    pub fn encoder<T: Tokenizer>(&self, tokenizer: T, lowercase: bool) -> TextEncoder<T> {
        TextEncoder::new(Arc::clone(&self.table), tokenizer, lowercase)
    }

    /// Returns `model` with an embedding lookup in front of `text_feature_name`.
    pub fn add_embedding_to_model<M: Model>(
        &self,
        model: M,
        text_feature_name: &str,
        config: AdapterConfig,
    ) -> EmbeddedModel<M> {
        EmbeddingLayerAdapter::new(Arc::clone(&self.table), config).wrap(model, text_feature_name)
    }
}
