//! Deferred computations evaluated against a [`Session`].

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use candle_core::Tensor;

use crate::{GraphError, Session};

type NodeFn = dyn Fn(&Session) -> Result<Tensor, GraphError> + Send + Sync;
type OpFn = dyn Fn(&Session) -> Result<(), GraphError> + Send + Sync;

/// A tensor-valued computation that runs when evaluated, not when built.
#[derive(Clone)]
pub struct Node(Arc<NodeFn>);

impl Node {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Session) -> Result<Tensor, GraphError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn constant(tensor: Tensor) -> Self {
        Self::new(move |_| Ok(tensor.clone()))
    }

    /// Reads the current value of a session variable.
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |session| session.read_variable(&name))
    }

    /// Applies a tensor operation to the output of this node.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(Tensor) -> candle_core::Result<Tensor> + Send + Sync + 'static,
    {
        let input = self.clone();
        Self::new(move |session| Ok(f(input.eval(session)?)?))
    }

    pub fn eval(&self, session: &Session) -> Result<Tensor, GraphError> {
        (self.0)(session)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Node(..)")
    }
}

/// A named side-effecting action: a train step, a run hook or an init hook.
#[derive(Clone)]
pub struct Op {
    name: Cow<'static, str>,
    run: Arc<OpFn>,
}

impl Op {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Session) -> Result<(), GraphError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, session: &Session) -> Result<(), GraphError> {
        (self.run)(session)
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Op").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn nodes_are_lazy_until_evaluated() {
        let session = Session::default();
        let base = Node::constant(Tensor::new(&[1.0f32, 2.0], session.device()).unwrap());
        let doubled = base.map(|t| t.affine(2.0, 0.0));
        assert_eq!(
            doubled.eval(&session).unwrap().to_vec1::<f32>().unwrap(),
            vec![2.0, 4.0]
        );

        let missing = Node::variable("absent");
        assert!(matches!(
            missing.eval(&session),
            Err(GraphError::UnknownVariable(_))
        ));
    }

    #[test]
    fn ops_run_each_time_they_are_invoked() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let op = Op::new("count", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let session = Session::default();
        op.run(&session).unwrap();
        op.clone().run(&session).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(op.name(), "count");
        assert_eq!(format!("{op:?}"), "Op(\"count\")");
    }
}
