use std::convert::Infallible;

/// Splits raw text into an ordered list of word tokens.
///
/// Any `Fn(&str) -> Result<Vec<String>, E>` is a tokenizer, so callers can
/// plug in their own segmentation without a wrapper type.
pub trait Tokenizer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn tokenize(&self, text: &str) -> Result<Vec<String>, Self::Error>;
}

impl<F, E> Tokenizer for F
where
    F: Fn(&str) -> Result<Vec<String>, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn tokenize(&self, text: &str) -> Result<Vec<String>, E> {
        self(text)
    }
}

/// Tokenizer splitting on Unicode whitespace.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    type Error = Infallible;

    fn tokenize(&self, text: &str) -> Result<Vec<String>, Infallible> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}
