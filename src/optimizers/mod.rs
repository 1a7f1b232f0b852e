//! Parameter update abstraction
//!
//! Layers compute gradients during `back_propagate` and hand every parameter
//! buffer they own to an [`Optimizer`] together with its gradient. The
//! update rule lives here, so forward/backward code never changes when the
//! rule does.
//!
//! # Available Optimizers
//!
//! - SGD: `param -= learning_rate * grad`
//!
//! # Example
//!
//! ```
//! use neural_engine::optimizers::{Optimizer, SGD};
//!
//! let mut optimizer = SGD::new(0.5);
//! let mut weights = vec![1.0, 2.0];
//! optimizer.update(&mut weights, &[0.2, 0.4]);
//! assert!((weights[0] - 0.9).abs() < 1e-6);
//! assert!((weights[1] - 1.8).abs() < 1e-6);
//! ```

pub mod sgd;

pub use sgd::SGD;

/// Core trait for parameter update rules.
///
/// # Notes
///
/// - `update` is called once per parameter buffer per backward pass, in the
///   order the layer owns them (weights first, then biases)
/// - Gradients are summed over the batch, not averaged
pub trait Optimizer {
    /// Apply the update rule to `parameters` in place. Both slices have the
    /// same length.
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]);

    /// Clear any accumulated state. No-op for stateless rules.
    fn reset(&mut self);

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, lr: f32);
}
