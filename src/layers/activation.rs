//! Stand-alone activation layer.
//!
//! Applies an element-wise activation to whatever shape it receives. Useful
//! after convolution layers, which produce linear output.

use crate::error::{NetworkError, Result};
use crate::layers::Layer;
use crate::layers::{check_input, LayerKind, LayerSnapshot};
use crate::matrix::Matrix;
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::{Activation, SimpleRng};
use serde::{Deserialize, Serialize};

/// ```json
/// { "type": "activation", "activation": "relu" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationConfig {
    pub activation: Activation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationSnapshot {
    pub activation: Activation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Shape>,
}

#[derive(Debug, Clone)]
pub struct ActivationLayer {
    activation: Activation,
    shape: Option<Shape>,
    batch_size: usize,
    input: Option<Matrix>,
}

impl ActivationLayer {
    pub fn new(config: ActivationConfig) -> Self {
        Self {
            activation: config.activation,
            shape: None,
            batch_size: 0,
            input: None,
        }
    }

    pub fn from_snapshot(snapshot: ActivationSnapshot) -> Self {
        let mut layer = Self::new(ActivationConfig {
            activation: snapshot.activation,
        });
        layer.shape = snapshot.input_shape;
        layer
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }
}

impl Layer for ActivationLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Activation
    }

    fn initialize(
        &mut self,
        input_shape: Shape,
        batch_size: usize,
        _rng: &mut SimpleRng,
    ) -> Result<Shape> {
        self.shape = Some(input_shape);
        self.reset(batch_size)?;
        Ok(input_shape)
    }

    fn output_shape(&self) -> Option<Shape> {
        self.shape
    }

    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix> {
        let shape = match self.shape {
            Some(shape) if self.batch_size > 0 => shape,
            _ => return Err(NetworkError::uninitialized("activation", "feed_forward")),
        };
        check_input("activation feed_forward", &input, self.batch_size, shape.size())?;

        let activation = self.activation;
        let output = input.map(|z| activation.activate(z));
        self.input = Some(input);
        Ok(output)
    }

    fn back_propagate(
        &mut self,
        error: &Matrix,
        _optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| NetworkError::uninitialized("activation", "back_propagate"))?;
        let activation = self.activation;
        error.zip_map(input, "activation back_propagate", |e, z| {
            e * activation.prime(z)
        })
    }

    fn reset(&mut self, batch_size: usize) -> Result<()> {
        if self.shape.is_none() {
            return Err(NetworkError::uninitialized("activation", "reset"));
        }
        self.batch_size = batch_size;
        self.input = None;
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Activation(ActivationSnapshot {
            activation: self.activation,
            input_shape: self.shape,
        })
    }
}
