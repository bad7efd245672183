//! Named variable storage shared by every execution of a model.

use std::collections::HashMap;

use candle_core::{DType, Device, Shape, Tensor, Var};
use parking_lot::RwLock;

use crate::GraphError;

#[derive(Clone, Debug)]
struct Variable {
    var: Var,
    trainable: bool,
    initialized: bool,
}

/// Holds the variables created by model functions and tracks their initialization.
///
/// Variables are created zero-filled but flagged uninitialized; reading one
/// before an init op assigned it is an error.
#[derive(Debug)]
pub struct Session {
    device: Device,
    variables: RwLock<HashMap<String, Variable>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Device::Cpu)
    }
}

impl Session {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            variables: RwLock::new(HashMap::new()),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns the variable `name`, creating it with `shape` on first use.
    ///
    /// Reusing a variable requires the same shape and trainability it was
    /// created with.
    pub fn get_or_create_variable(
        &self,
        name: &str,
        shape: &[usize],
        trainable: bool,
    ) -> Result<Var, GraphError> {
        let mut variables = self.variables.write();
        if let Some(existing) = variables.get(name) {
            if existing.var.dims() != shape {
                return Err(GraphError::ShapeMismatch {
                    name: name.to_string(),
                    existing: existing.var.dims().to_vec(),
                    requested: shape.to_vec(),
                });
            }
            if existing.trainable != trainable {
                return Err(GraphError::TrainableMismatch {
                    name: name.to_string(),
                    existing: existing.trainable,
                    requested: trainable,
                });
            }
            return Ok(existing.var.clone());
        }
        let var = Var::zeros(Shape::from(shape.to_vec()), DType::F32, &self.device)?;
        variables.insert(
            name.to_string(),
            Variable {
                var: var.clone(),
                trainable,
                initialized: false,
            },
        );
        Ok(var)
    }

    /// Overwrites the value of `name` and marks it initialized.
    pub fn assign(&self, name: &str, value: &Tensor) -> Result<(), GraphError> {
        let mut variables = self.variables.write();
        let variable = variables
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownVariable(name.to_string()))?;
        variable.var.set(value)?;
        variable.initialized = true;
        Ok(())
    }

    /// Assigns `name` from `init` unless it is already initialized.
    ///
    /// Returns whether `init` ran. The check and the assignment happen under
    /// one lock, so concurrent callers initialize a variable at most once.
    pub fn initialize_variable<F>(&self, name: &str, init: F) -> Result<bool, GraphError>
    where
        F: FnOnce(&Device) -> Result<Tensor, GraphError>,
    {
        let mut variables = self.variables.write();
        let variable = variables
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownVariable(name.to_string()))?;
        if variable.initialized {
            return Ok(false);
        }
        let value = init(&self.device)?;
        variable.var.set(&value)?;
        variable.initialized = true;
        Ok(true)
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.variables
            .read()
            .get(name)
            .is_some_and(|variable| variable.initialized)
    }

    pub fn is_trainable(&self, name: &str) -> bool {
        self.variables
            .read()
            .get(name)
            .is_some_and(|variable| variable.trainable)
    }

    /// Current value of an initialized variable.
    pub fn read_variable(&self, name: &str) -> Result<Tensor, GraphError> {
        let variables = self.variables.read();
        let variable = variables
            .get(name)
            .ok_or_else(|| GraphError::UnknownVariable(name.to_string()))?;
        if !variable.initialized {
            return Err(GraphError::Uninitialized(name.to_string()));
        }
        Ok(variable.var.as_tensor().clone())
    }

    /// Trainable variables sorted by name, e.g. to hand to an optimizer.
    pub fn trainable_variables(&self) -> Vec<(String, Var)> {
        let mut trainable: Vec<_> = self
            .variables
            .read()
            .iter()
            .filter(|(_, variable)| variable.trainable)
            .map(|(name, variable)| (name.clone(), variable.var.clone()))
            .collect();
        trainable.sort_by(|a, b| a.0.cmp(&b.0));
        trainable
    }

    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.variables.read().keys().cloned().collect();
        names.sort();
        names
    }
}
