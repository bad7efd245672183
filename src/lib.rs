//! Word-vector preprocessing for training pipelines.
//!
//! Loads a pretrained word-vector file into a vocabulary and embedding matrix
//! ([`vocab`]), encodes text into index sequences ([`text_encoder`]) and
//! prepends an embedding lookup to models that expect embedded input
//! ([`embedding_adapter`]).

pub mod preprocessor;

pub use embedding_adapter;
pub use text_encoder;
pub use vocab;

pub use preprocessor::TextPreprocessor;
