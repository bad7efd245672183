//! Execution specs returned by model functions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GraphError, Node, Op, Session};

/// Which kind of execution a model function is building for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Train,
    Eval,
    Predict,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => f.write_str("train"),
            Mode::Eval => f.write_str("eval"),
            Mode::Predict => f.write_str("predict"),
        }
    }
}

/// Setup-time state of an execution: the ordered initialization ops.
#[derive(Clone, Debug, Default)]
pub struct Scaffold {
    init_ops: Vec<Op>,
}

impl Scaffold {
    pub fn new(init_ops: Vec<Op>) -> Self {
        Self { init_ops }
    }

    pub fn init_ops(&self) -> &[Op] {
        &self.init_ops
    }

    /// Runs `op` before every init op already registered.
    pub fn prepend_init_op(&mut self, op: Op) {
        self.init_ops.insert(0, op);
    }

    pub fn push_init_op(&mut self, op: Op) {
        self.init_ops.push(op);
    }

    /// Runs the init ops in order, stopping at the first failure.
    pub fn initialize(&self, session: &Session) -> Result<(), GraphError> {
        for op in &self.init_ops {
            op.run(session)?;
        }
        Ok(())
    }
}

/// Everything a model function produces for one [`Mode`].
#[derive(Clone, Debug)]
pub struct ExecutionSpec {
    pub mode: Mode,
    pub predictions: BTreeMap<String, Node>,
    pub loss: Option<Node>,
    pub train_op: Option<Op>,
    pub eval_metrics: BTreeMap<String, Node>,
    pub export_outputs: BTreeMap<String, Node>,
    pub training_chief_hooks: Vec<Op>,
    pub training_hooks: Vec<Op>,
    pub evaluation_hooks: Vec<Op>,
    pub prediction_hooks: Vec<Op>,
    pub scaffold: Scaffold,
}

impl ExecutionSpec {
    /// An empty spec for `mode`; model functions fill in the slots they use.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            predictions: BTreeMap::new(),
            loss: None,
            train_op: None,
            eval_metrics: BTreeMap::new(),
            export_outputs: BTreeMap::new(),
            training_chief_hooks: Vec::new(),
            training_hooks: Vec::new(),
            evaluation_hooks: Vec::new(),
            prediction_hooks: Vec::new(),
            scaffold: Scaffold::default(),
        }
    }
}
