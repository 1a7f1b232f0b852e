//! Flatten layer: reshape `[C, H, W]` → `[C·H·W]`.
//!
//! Buffers already hold one sample per row, so the data passes through
//! untouched; only the shape seen by the next layer changes.

use crate::error::{NetworkError, Result};
use crate::layers::Layer;
use crate::layers::{check_input, LayerKind, LayerSnapshot};
use crate::matrix::Matrix;
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::SimpleRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlattenConfig {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Shape>,
}

#[derive(Debug, Clone, Default)]
pub struct FlattenLayer {
    input_shape: Option<Shape>,
    batch_size: usize,
}

impl FlattenLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: FlattenSnapshot) -> Self {
        Self {
            input_shape: snapshot.input_shape,
            batch_size: 0,
        }
    }
}

impl Layer for FlattenLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Flatten
    }

    fn initialize(
        &mut self,
        input_shape: Shape,
        batch_size: usize,
        _rng: &mut SimpleRng,
    ) -> Result<Shape> {
        self.input_shape = Some(input_shape);
        self.reset(batch_size)?;
        Ok(Shape::Flat(input_shape.size()))
    }

    fn output_shape(&self) -> Option<Shape> {
        self.input_shape.map(|shape| Shape::Flat(shape.size()))
    }

    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix> {
        let shape = match self.input_shape {
            Some(shape) if self.batch_size > 0 => shape,
            _ => return Err(NetworkError::uninitialized("flatten", "feed_forward")),
        };
        check_input("flatten feed_forward", &input, self.batch_size, shape.size())?;
        Ok(input)
    }

    fn back_propagate(
        &mut self,
        error: &Matrix,
        _optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        let shape = self
            .input_shape
            .ok_or_else(|| NetworkError::uninitialized("flatten", "back_propagate"))?;
        check_input("flatten back_propagate", error, self.batch_size, shape.size())?;
        Ok(error.clone())
    }

    fn reset(&mut self, batch_size: usize) -> Result<()> {
        if self.input_shape.is_none() {
            return Err(NetworkError::uninitialized("flatten", "reset"));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Flatten(FlattenSnapshot {
            input_shape: self.input_shape,
        })
    }
}
