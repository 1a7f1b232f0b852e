//! Plain stochastic gradient descent

use crate::optimizers::Optimizer;

/// `param -= learning_rate * grad`, with no momentum or per-parameter state.
///
/// ```
/// use neural_engine::optimizers::{Optimizer, SGD};
///
/// let mut sgd = SGD::new(0.1);
/// let mut bias = vec![0.5, -0.5];
/// sgd.update(&mut bias, &[1.0, -1.0]);
/// assert!((bias[0] - 0.4).abs() < 1e-6);
/// assert!((bias[1] + 0.4).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for SGD {
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        debug_assert_eq!(parameters.len(), gradients.len());
        let rate = self.learning_rate;
        parameters
            .iter_mut()
            .zip(gradients)
            .for_each(|(param, grad)| *param -= rate * grad);
    }

    fn reset(&mut self) {}

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}
