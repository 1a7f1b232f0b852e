//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer that performs the transformation
//! `output = activation(input × weights + biases)`. The dense layer is also
//! the only kind allowed as a network's output layer.

use crate::error::{NetworkError, Result};
use crate::layers::{check_input, LayerKind, LayerSnapshot};
use crate::layers::Layer;
use crate::matrix::Matrix;
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::{Activation, SimpleRng};
use serde::{Deserialize, Serialize};

/// Static configuration of a dense layer.
///
/// ```json
/// { "type": "dense", "size": 3, "activation": "sigmoid" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseConfig {
    /// Number of output units
    pub size: usize,
    /// Activation applied to the linear output (default: sigmoid)
    #[serde(default)]
    pub activation: Activation,
}

impl DenseConfig {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            activation: Activation::default(),
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }
}

/// Snapshot of a dense layer: configuration plus learned parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseSnapshot {
    pub size: usize,
    pub activation: Activation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Shape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Matrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biases: Option<Matrix>,
}

/// Dense (fully connected) layer with weights and biases.
///
/// Performs `y = f(xW + b)` where x is the input (batch_size × inputs),
/// W is the weight matrix (inputs × size) and b the bias row (1 × size).
///
/// The activation derivative is applied inside this layer's backward pass,
/// at the pre-activation value cached during the forward pass, so each
/// layer boundary sees it exactly once.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    config: DenseConfig,
    input_shape: Option<Shape>,
    batch_size: usize,
    weights: Option<Matrix>,
    biases: Option<Matrix>,
    input: Option<Matrix>,
    pre_activation: Option<Matrix>,
    output: Option<Matrix>,
}

impl DenseLayer {
    pub fn new(config: DenseConfig) -> Self {
        Self {
            config,
            input_shape: None,
            batch_size: 0,
            weights: None,
            biases: None,
            input: None,
            pre_activation: None,
            output: None,
        }
    }

    /// Build a layer around existing parameters.
    ///
    /// `weights` is `inputs × size`, `biases` is `1 × size`.
    pub fn from_parameters(
        weights: Matrix,
        biases: Matrix,
        activation: Activation,
    ) -> Result<Self> {
        if biases.shape() != (1, weights.cols()) {
            return Err(NetworkError::shape_mismatch(
                "dense biases",
                format!("1x{}", weights.cols()),
                &biases,
            ));
        }
        let mut layer = Self::new(DenseConfig::new(weights.cols()).with_activation(activation));
        layer.weights = Some(weights);
        layer.biases = Some(biases);
        Ok(layer)
    }

    pub fn from_snapshot(snapshot: DenseSnapshot) -> Result<Self> {
        let mut layer = match (snapshot.weights, snapshot.biases) {
            (Some(weights), Some(biases)) => {
                if weights.cols() != snapshot.size {
                    return Err(NetworkError::shape_mismatch(
                        "dense snapshot",
                        format!("{} weight columns", snapshot.size),
                        weights.cols(),
                    ));
                }
                Self::from_parameters(weights, biases, snapshot.activation)?
            }
            (None, None) => Self::new(
                DenseConfig::new(snapshot.size).with_activation(snapshot.activation),
            ),
            _ => {
                return Err(NetworkError::invalid_config(
                    "dense snapshot must carry both weights and biases or neither",
                ))
            }
        };
        layer.input_shape = snapshot.input_shape;
        Ok(layer)
    }

    pub fn config(&self) -> &DenseConfig {
        &self.config
    }

    pub fn activation(&self) -> Activation {
        self.config.activation
    }

    pub fn weights(&self) -> Option<&Matrix> {
        self.weights.as_ref()
    }

    pub fn biases(&self) -> Option<&Matrix> {
        self.biases.as_ref()
    }

    /// Activation produced by the most recent forward pass.
    pub fn output(&self) -> Option<&Matrix> {
        self.output.as_ref()
    }

    fn input_size(&self) -> Result<usize> {
        match self.input_shape {
            Some(shape) => Ok(shape.size()),
            None => Err(NetworkError::uninitialized("dense", "input size")),
        }
    }
}

impl Layer for DenseLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Dense
    }

    fn initialize(
        &mut self,
        input_shape: Shape,
        batch_size: usize,
        rng: &mut SimpleRng,
    ) -> Result<Shape> {
        let inputs = match input_shape {
            Shape::Flat(n) => n,
            other => {
                return Err(NetworkError::shape_mismatch(
                    "dense initialize",
                    "flat input (add a flatten layer)",
                    other,
                ))
            }
        };
        if self.config.size == 0 || inputs == 0 {
            return Err(NetworkError::invalid_config(
                "dense layer needs at least one input and one unit",
            ));
        }

        match &self.weights {
            Some(weights) if weights.rows() != inputs => {
                return Err(NetworkError::shape_mismatch(
                    "dense initialize",
                    format!("{} inputs", weights.rows()),
                    input_shape,
                ));
            }
            Some(_) => {}
            None => {
                // Xavier initialization: limit = sqrt(6 / (fan_in + fan_out))
                let mut weights = Matrix::with(inputs, self.config.size);
                rng.fill_xavier(weights.data_mut(), inputs, self.config.size);
                self.weights = Some(weights);
                self.biases = Some(Matrix::with(1, self.config.size));
            }
        }

        self.input_shape = Some(input_shape);
        self.reset(batch_size)?;
        Ok(Shape::Flat(self.config.size))
    }

    fn output_shape(&self) -> Option<Shape> {
        self.input_shape.map(|_| Shape::Flat(self.config.size))
    }

    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix> {
        let (weights, biases) = match (&self.weights, &self.biases) {
            (Some(w), Some(b)) if self.batch_size > 0 => (w, b),
            _ => return Err(NetworkError::uninitialized("dense", "feed_forward")),
        };
        check_input("dense feed_forward", &input, self.batch_size, self.input_size()?)?;

        let z = input.dot(weights)?.add_row(biases)?;
        let activation = self.config.activation;
        let output = z.map(|v| activation.activate(v));

        self.input = Some(input);
        self.pre_activation = Some(z);
        self.output = Some(output.clone());
        Ok(output)
    }

    fn back_propagate(
        &mut self,
        error: &Matrix,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        let (input, z) = match (&self.input, &self.pre_activation) {
            (Some(input), Some(z)) => (input, z),
            _ => return Err(NetworkError::uninitialized("dense", "back_propagate")),
        };
        let (weights, biases) = match (self.weights.as_mut(), self.biases.as_mut()) {
            (Some(w), Some(b)) => (w, b),
            _ => return Err(NetworkError::uninitialized("dense", "back_propagate")),
        };

        let activation = self.config.activation;
        let delta = error.zip_map(z, "dense back_propagate", |e, z| e * activation.prime(z))?;

        let weight_gradient = input.transpose().dot(&delta)?;
        let bias_gradient = delta.sum_rows();
        let previous_error = delta.dot(&weights.transpose())?;

        optimizer.update(weights.data_mut(), weight_gradient.data());
        optimizer.update(biases.data_mut(), bias_gradient.data());

        Ok(previous_error)
    }

    fn reset(&mut self, batch_size: usize) -> Result<()> {
        if self.input_shape.is_none() {
            return Err(NetworkError::uninitialized("dense", "reset"));
        }
        self.batch_size = batch_size;
        self.input = None;
        self.pre_activation = None;
        self.output = None;
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        self.weights.as_ref().map_or(0, Matrix::len) + self.biases.as_ref().map_or(0, Matrix::len)
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Dense(DenseSnapshot {
            size: self.config.size,
            activation: self.config.activation,
            input_shape: self.input_shape,
            weights: self.weights.clone(),
            biases: self.biases.clone(),
        })
    }
}
