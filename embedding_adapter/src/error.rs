use thiserror::Error;

/// Errors raised while building or evaluating model graphs.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
    /// The features passed to a model do not contain the expected entry.
    #[error("feature `{0}` is missing from the model inputs")]
    MissingFeature(String),
    #[error("variable `{0}` does not exist in the session")]
    UnknownVariable(String),
    /// A variable was read before any initialization hook assigned it.
    #[error("variable `{0}` was read before it was initialized")]
    Uninitialized(String),
    #[error("variable `{name}` already exists with shape {existing:?}, requested {requested:?}")]
    ShapeMismatch {
        name: String,
        existing: Vec<usize>,
        requested: Vec<usize>,
    },
    #[error("variable `{name}` already exists with trainable = {existing}, requested {requested}")]
    TrainableMismatch {
        name: String,
        existing: bool,
        requested: bool,
    },
    #[error("token index {index} is out of range for an embedding table with {rows} rows")]
    IndexOutOfRange { index: i64, rows: usize },
    /// Token ids must be `u32` or `i64`; float ids would be truncated.
    #[error("token ids must be u32 or i64, got {0:?}")]
    UnsupportedIdType(candle_core::DType),
    /// Failure reported by a wrapped model.
    #[error("model error: {0}")]
    Model(String),
}
