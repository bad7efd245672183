use std::collections::BTreeMap;

use crate::{ExecutionSpec, GraphError, Mode, Node, Session};

/// Named model inputs.
pub type Features = BTreeMap<String, Node>;
/// Named training targets; absent in [`Mode::Predict`].
pub type Labels = BTreeMap<String, Node>;

/// A trainable model as seen by a training harness.
///
/// `model_fn` is called once per mode to build an [`ExecutionSpec`]; the
/// harness then runs the spec's scaffold against the same [`Session`] before
/// evaluating any of its outputs.
pub trait Model {
    /// Hyper-parameters or other configuration carried by the model.
    type Params;

    fn params(&self) -> &Self::Params;

    fn model_fn(
        &self,
        features: Features,
        labels: Option<Labels>,
        mode: Mode,
        session: &Session,
    ) -> Result<ExecutionSpec, GraphError>;
}
