//! Embedding-layer adapter: turns a model over embedded text into one over
//! token indices.
//!
//! The crate carries a minimal execution contract ([`Model`], [`ExecutionSpec`],
//! [`Session`], deferred [`Node`]s and [`Op`]s) so the adapter can compose its
//! initialization with whatever the wrapped model registers.

mod adapter;
mod error;
mod graph;
mod model;
mod session;
mod spec;

pub use adapter::{AdapterConfig, EmbeddedModel, EmbeddingLayerAdapter, EMBEDDING_INIT_OP};
pub use error::GraphError;
pub use graph::{Node, Op};
pub use model::{Features, Labels, Model};
pub use session::Session;
pub use spec::{ExecutionSpec, Mode, Scaffold};
