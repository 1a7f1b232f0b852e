//! Layer trait definition for neural network layers
//!
//! This module defines the core Layer trait that every layer kind implements.
//! The trait covers the whole lifecycle of a layer inside a network: shape
//! resolution and parameter allocation, forward propagation, backward
//! propagation with an in-place parameter update, batch resizing and
//! snapshotting.

use crate::error::Result;
use crate::layers::{LayerKind, LayerSnapshot};
use crate::matrix::Matrix;
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::SimpleRng;

/// Core trait for neural network layers.
///
/// A layer is constructed from its static configuration only. Shapes are
/// unknown until [`initialize`](Layer::initialize) runs.
///
/// Buffers cross layer boundaries by value: `feed_forward` takes ownership of
/// its input and returns a freshly allocated output, `back_propagate` borrows
/// the incoming error and returns a fresh error for the previous layer.
///
/// # Example
///
/// ```
/// use neural_engine::layers::{DenseConfig, DenseLayer, Layer};
/// use neural_engine::optimizers::SGD;
/// use neural_engine::utils::SimpleRng;
/// use neural_engine::{Matrix, Shape};
///
/// let mut layer = DenseLayer::new(DenseConfig::new(3));
/// let mut rng = SimpleRng::new(42);
/// let out_shape = layer.initialize(Shape::Flat(4), 2, &mut rng).unwrap();
/// assert_eq!(out_shape, Shape::Flat(3));
///
/// let output = layer.feed_forward(Matrix::with(2, 4)).unwrap();
/// assert_eq!(output.shape(), (2, 3));
///
/// let grad_input = layer
///     .back_propagate(&Matrix::with(2, 3), &mut SGD::new(0.1))
///     .unwrap();
/// assert_eq!(grad_input.shape(), (2, 4));
/// ```
pub trait Layer {
    fn kind(&self) -> LayerKind;

    /// Resolve the output shape from `input_shape` and allocate buffers.
    ///
    /// Parameters are allocated on the first call only. Later calls (for
    /// example with another batch size) keep the learned parameters and
    /// fail with `ShapeMismatch` if they do not fit `input_shape`.
    fn initialize(
        &mut self,
        input_shape: Shape,
        batch_size: usize,
        rng: &mut SimpleRng,
    ) -> Result<Shape>;

    /// Output shape resolved by the last `initialize`, if any.
    fn output_shape(&self) -> Option<Shape>;

    /// Forward propagation for a `batch_size × input_shape.size()` buffer.
    ///
    /// Caches whatever the backward pass needs.
    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix>;

    /// Backward propagation.
    ///
    /// `error` is the gradient of the loss with respect to this layer's
    /// output. Parameter gradients are summed over the batch and handed to
    /// `optimizer`; the returned buffer is the gradient with respect to this
    /// layer's input, computed with the parameters from before the update.
    fn back_propagate(&mut self, error: &Matrix, optimizer: &mut dyn Optimizer)
        -> Result<Matrix>;

    /// Switch to a new batch size without touching parameters.
    fn reset(&mut self, batch_size: usize) -> Result<()>;

    /// Number of trainable parameters (zero before initialization).
    fn parameter_count(&self) -> usize;

    /// Serializable snapshot sufficient to rebuild an equivalent layer.
    fn snapshot(&self) -> LayerSnapshot;
}
