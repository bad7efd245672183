//! Prepends an embedding lookup to a model that expects embedded text.

use std::sync::Arc;

use candle_core::{DType, Var};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vocab::EmbeddingTable;

use crate::{ExecutionSpec, Features, GraphError, Labels, Mode, Model, Node, Op, Session};

/// Name of the init op registered by the adapter.
pub const EMBEDDING_INIT_OP: &str = "embedding_init";

/// Options for [`EmbeddingLayerAdapter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Whether the embedding variable is updated during training.
    pub trainable: bool,
    pub variable_name: String,
    /// Append a trailing unit dimension to labels outside prediction, for
    /// models whose outputs are shaped `[batch, 1]`.
    pub expand_label_dims: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            trainable: false,
            variable_name: "embeddings".to_string(),
            expand_label_dims: true,
        }
    }
}

/// Wraps models so they accept token indices instead of embedded vectors.
#[derive(Clone, Debug)]
pub struct EmbeddingLayerAdapter {
    table: Arc<EmbeddingTable>,
    config: AdapterConfig,
}

impl EmbeddingLayerAdapter {
    pub fn new(table: Arc<EmbeddingTable>, config: AdapterConfig) -> Self {
        Self { table, config }
    }

    /// Returns the adapter options.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Returns the table whose matrix seeds the embedding variable.
    pub fn table(&self) -> &EmbeddingTable {
        &self.table
    }

    /// Shape of the embedding variable, `[vocab + 2, embedding_size]`.
    pub fn shape(&self) -> [usize; 2] {
        let matrix = self.table.matrix();
        [matrix.rows(), matrix.dims()]
    }

    /// Creates or reuses the embedding variable and returns the op that loads
    /// the matrix into it.
    ///
    /// The variable stays uninitialized until the op runs. The op is a no-op
    /// once the variable holds a value, so trained weights survive a second
    /// initialization pass.
    pub fn word_embeddings(&self, session: &Session) -> Result<(Var, Op), GraphError> {
        let var = session.get_or_create_variable(
            &self.config.variable_name,
            &self.shape(),
            self.config.trainable,
        )?;
        let name = self.config.variable_name.clone();
        let table = Arc::clone(&self.table);
        let init = Op::new(EMBEDDING_INIT_OP, move |session| {
            let loaded = session.initialize_variable(&name, |device| {
                Ok(table.matrix().to_tensor(device)?)
            })?;
            if loaded {
                debug!(
                    variable = %name,
                    rows = table.matrix().rows(),
                    "embedding matrix loaded"
                );
            }
            Ok(())
        });
        Ok((var, init))
    }

    /// Returns a model that looks up `text_feature_name` in the embedding
    /// table before delegating to `model`.
    pub fn wrap<M: Model>(
        &self,
        model: M,
        text_feature_name: impl Into<String>,
    ) -> EmbeddedModel<M> {
        EmbeddedModel {
            inner: model,
            adapter: self.clone(),
            text_feature_name: text_feature_name.into(),
        }
    }
}

/// A model with an embedding lookup in front of its text feature.
#[derive(Clone, Debug)]
pub struct EmbeddedModel<M> {
    inner: M,
    adapter: EmbeddingLayerAdapter,
    text_feature_name: String,
}

impl<M> EmbeddedModel<M> {
    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn text_feature_name(&self) -> &str {
        &self.text_feature_name
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<M: Model> Model for EmbeddedModel<M> {
    type Params = M::Params;

    fn params(&self) -> &M::Params {
        self.inner.params()
    }

    fn model_fn(
        &self,
        mut features: Features,
        labels: Option<Labels>,
        mode: Mode,
        session: &Session,
    ) -> Result<ExecutionSpec, GraphError> {
        let config = self.adapter.config();
        let (_, init) = self.adapter.word_embeddings(session)?;

        let ids = features
            .remove(&self.text_feature_name)
            .ok_or_else(|| GraphError::MissingFeature(self.text_feature_name.clone()))?;
        features.insert(
            self.text_feature_name.clone(),
            embedding_lookup(config.variable_name.clone(), ids),
        );

        let labels = match labels {
            Some(labels) if mode != Mode::Predict && config.expand_label_dims => {
                Some(expand_label_dims(labels))
            }
            labels => labels,
        };

        debug!(
            feature = %self.text_feature_name,
            %mode,
            trainable = config.trainable,
            "embedding lookup prepended"
        );

        let mut spec = self.inner.model_fn(features, labels, mode, session)?;
        spec.scaffold.prepend_init_op(init);
        Ok(spec)
    }
}

/// Gathers embedding rows for integer ids of any shape, appending the
/// embedding dimension to the id shape. Ids must be `u32` or `i64`.
fn embedding_lookup(variable: String, ids: Node) -> Node {
    Node::new(move |session| {
        let table = session.read_variable(&variable)?;
        let (rows, dims) = table.dims2()?;
        let ids = ids.eval(session)?;
        let flat = ids.flatten_all()?;
        let indices: Vec<i64> = match flat.dtype() {
            DType::U32 => flat.to_vec1::<u32>()?.into_iter().map(i64::from).collect(),
            DType::I64 => flat.to_vec1::<i64>()?,
            dtype => return Err(GraphError::UnsupportedIdType(dtype)),
        };
        let out_of_range = indices
            .into_iter()
            .find(|&index| index < 0 || index as usize >= rows);
        if let Some(index) = out_of_range {
            return Err(GraphError::IndexOutOfRange { index, rows });
        }
        let flat = flat.to_dtype(DType::U32)?;
        let mut shape = ids.dims().to_vec();
        shape.push(dims);
        Ok(table.index_select(&flat, 0)?.reshape(shape)?)
    })
}

fn expand_label_dims(labels: Labels) -> Labels {
    labels
        .into_iter()
        .map(|(name, label)| {
            let expanded = label.map(|tensor| {
                let rank = tensor.rank();
                tensor.unsqueeze(rank)
            });
            (name, expanded)
        })
        .collect()
}
