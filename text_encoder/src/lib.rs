//! Text-to-index transform built on a loaded [`EmbeddingTable`].

mod tokenizer;

use std::sync::Arc;

use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vocab::EmbeddingTable;

pub use tokenizer::{Tokenizer, WhitespaceTokenizer};

/// Options for [`TextEncoder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Lowercase tokens before looking them up.
    pub lowercase: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { lowercase: true }
    }
}

/// Errors raised by the byte and tensor entry points of [`TextEncoder`].
#[derive(Debug, Error)]
pub enum EncodeError<E>
where
    E: std::error::Error + 'static,
{
    #[error("input text is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Tokenizer(E),
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Maps text to vocabulary indices, substituting the unknown index for misses.
///
/// The encoder only reads the shared table, so one instance can serve many
/// threads at once.
#[derive(Clone, Debug)]
pub struct TextEncoder<T> {
    table: Arc<EmbeddingTable>,
    tokenizer: T,
    lowercase: bool,
}

/// Creates an encoder over `table` using `tokenizer`.
pub fn make_encoder<T: Tokenizer>(
    table: Arc<EmbeddingTable>,
    tokenizer: T,
    config: &EncoderConfig,
) -> TextEncoder<T> {
    TextEncoder::new(table, tokenizer, config.lowercase)
}

impl<T: Tokenizer> TextEncoder<T> {
    pub fn new(table: Arc<EmbeddingTable>, tokenizer: T, lowercase: bool) -> Self {
        Self {
            table,
            tokenizer,
            lowercase,
        }
    }

    pub fn table(&self) -> &EmbeddingTable {
        &self.table
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    /// Encodes `text` into one index per token, in token order.
    ///
    /// Tokenizer failures are returned unchanged.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, T::Error> {
        let tokens = self.tokenizer.tokenize(text)?;
        Ok(tokens.iter().map(|token| self.index_of(token)).collect())
    }

    /// Decodes UTF-8 bytes and encodes the resulting text.
    pub fn encode_bytes(&self, bytes: &[u8]) -> Result<Vec<u32>, EncodeError<T::Error>> {
        let text = std::str::from_utf8(bytes)?;
        self.encode(text).map_err(EncodeError::Tokenizer)
    }

    /// Encodes `text` into a 1-D `u32` tensor ready for an embedding lookup.
    pub fn encode_to_tensor(
        &self,
        text: &str,
        device: &Device,
    ) -> Result<Tensor, EncodeError<T::Error>> {
        let ids = self.encode(text).map_err(EncodeError::Tokenizer)?;
        let len = ids.len();
        Ok(Tensor::from_vec(ids, len, device)?)
    }

    /// Turns the encoder into a plain function, e.g. for a dataset map step.
    pub fn into_fn(self) -> impl Fn(&str) -> Result<Vec<u32>, T::Error> {
        move |text: &str| self.encode(text)
    }

    fn index_of(&self, token: &str) -> u32 {
        if self.lowercase {
            self.table.lookup(&token.to_lowercase())
        } else {
            self.table.lookup(token)
        }
    }
}
