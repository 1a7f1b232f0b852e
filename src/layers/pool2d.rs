//! Pooling layer: MaxPool2D / AvgPool2D.
//!
//! Reduces spatial dimensions of feature maps channel by channel.
//! No learnable parameters.

use crate::error::{NetworkError, Result};
use crate::layers::Layer;
use crate::layers::{check_input, LayerKind, LayerSnapshot};
use crate::matrix::Matrix;
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::SimpleRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolMode {
    #[default]
    Max,
    Avg,
}

fn default_size() -> usize {
    2
}

/// Static configuration of a pooling layer.
///
/// ```json
/// { "type": "pool", "size": 2, "stride": 2, "mode": "max" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Side of the square pooling window
    #[serde(default = "default_size")]
    pub size: usize,
    /// Window step; defaults to the window size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    #[serde(default)]
    pub mode: PoolMode,
}

impl PoolConfig {
    pub fn max(size: usize) -> Self {
        Self {
            size,
            stride: None,
            mode: PoolMode::Max,
        }
    }

    pub fn avg(size: usize) -> Self {
        Self {
            size,
            stride: None,
            mode: PoolMode::Avg,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub fn stride(&self) -> usize {
        self.stride.unwrap_or(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(flatten)]
    pub config: PoolConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Shape>,
}

/// Pooling layer over `[C, H, W]` samples.
///
/// Output is `[C, H', W']` with `H' = (H - size) / stride + 1`.
///
/// In max mode the forward pass records, for every output cell, the index
/// inside the input sample that held the window maximum (first one in scan
/// order on ties). The backward pass routes each output cell's error to
/// that index only. The map is rebuilt on every forward pass and dropped on
/// reset.
#[derive(Debug, Clone)]
pub struct Pool2DLayer {
    config: PoolConfig,
    input_shape: Option<Shape>,
    output_shape: Option<Shape>,
    batch_size: usize,
    argmax: Option<Vec<usize>>,
}

impl Pool2DLayer {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            input_shape: None,
            output_shape: None,
            batch_size: 0,
            argmax: None,
        }
    }

    pub fn from_snapshot(snapshot: PoolSnapshot) -> Result<Self> {
        let mut layer = Self::new(snapshot.config);
        if let Some(input_shape) = snapshot.input_shape {
            layer.output_shape = Some(layer.resolve_output(input_shape)?);
            layer.input_shape = Some(input_shape);
        }
        Ok(layer)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Argmax index map of the last max-mode forward pass, one entry per
    /// output value (row-major over the batch).
    pub fn argmax(&self) -> Option<&[usize]> {
        self.argmax.as_deref()
    }

    fn resolve_output(&self, input_shape: Shape) -> Result<Shape> {
        let (channels, height, width) = match input_shape {
            Shape::Image {
                channels,
                height,
                width,
            } => (channels, height, width),
            other => {
                return Err(NetworkError::shape_mismatch(
                    "pool initialize",
                    "image input [channels, height, width]",
                    other,
                ))
            }
        };
        let size = self.config.size;
        let stride = self.config.stride();
        if size == 0 || stride == 0 {
            return Err(NetworkError::invalid_config(
                "pool layer needs size and stride greater than 0",
            ));
        }
        if height < size || width < size {
            return Err(NetworkError::shape_mismatch(
                "pool initialize",
                format!("input of at least {}x{}", size, size),
                format!("{}x{}", height, width),
            ));
        }

        Ok(Shape::image(
            channels,
            (height - size) / stride + 1,
            (width - size) / stride + 1,
        ))
    }

    fn dims(&self) -> Result<(usize, usize, usize, usize, usize)> {
        match (self.input_shape, self.output_shape) {
            (
                Some(Shape::Image {
                    channels,
                    height,
                    width,
                }),
                Some(Shape::Image {
                    height: out_height,
                    width: out_width,
                    ..
                }),
            ) => Ok((channels, height, width, out_height, out_width)),
            _ => Err(NetworkError::uninitialized("pool", "geometry")),
        }
    }
}

impl Layer for Pool2DLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Pool
    }

    fn initialize(
        &mut self,
        input_shape: Shape,
        batch_size: usize,
        _rng: &mut SimpleRng,
    ) -> Result<Shape> {
        let output_shape = self.resolve_output(input_shape)?;
        self.input_shape = Some(input_shape);
        self.output_shape = Some(output_shape);
        self.reset(batch_size)?;
        Ok(output_shape)
    }

    fn output_shape(&self) -> Option<Shape> {
        self.output_shape
    }

    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix> {
        if self.batch_size == 0 {
            return Err(NetworkError::uninitialized("pool", "feed_forward"));
        }
        let (channels, height, width, out_h, out_w) = self.dims()?;
        check_input("pool feed_forward", &input, self.batch_size, channels * height * width)?;

        let size = self.config.size;
        let stride = self.config.stride();
        let in_spatial = height * width;
        let out_spatial = out_h * out_w;
        let mut output = Matrix::with(input.rows(), channels * out_spatial);
        let mut argmax = match self.config.mode {
            PoolMode::Max => Some(vec![0usize; output.len()]),
            PoolMode::Avg => None,
        };
        let window = (size * size) as f32;

        for b in 0..input.rows() {
            let x = input.row(b);
            let row_base = b * output.cols();
            let out = output.row_mut(b);
            for c in 0..channels {
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let first = c * in_spatial + oy * stride * width + ox * stride;
                        let mut best = x[first];
                        let mut best_idx = first;
                        let mut sum = 0.0f32;

                        for dy in 0..size {
                            for dx in 0..size {
                                let idx = first + dy * width + dx;
                                let v = x[idx];
                                sum += v;
                                if v > best {
                                    best = v;
                                    best_idx = idx;
                                }
                            }
                        }

                        let o = c * out_spatial + oy * out_w + ox;
                        match argmax.as_mut() {
                            Some(map) => {
                                out[o] = best;
                                map[row_base + o] = best_idx;
                            }
                            None => out[o] = sum / window,
                        }
                    }
                }
            }
        }

        self.argmax = argmax;
        Ok(output)
    }

    fn back_propagate(
        &mut self,
        error: &Matrix,
        _optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        let (channels, height, width, out_h, out_w) = self.dims()?;
        let out_size = channels * out_h * out_w;
        if error.shape() != (self.batch_size, out_size) {
            return Err(NetworkError::shape_mismatch(
                "pool back_propagate",
                format!("{}x{}", self.batch_size, out_size),
                error,
            ));
        }

        let mut previous_error = Matrix::with(error.rows(), channels * height * width);
        match self.config.mode {
            PoolMode::Max => {
                let argmax = self
                    .argmax
                    .as_ref()
                    .ok_or_else(|| NetworkError::uninitialized("pool", "back_propagate"))?;
                for b in 0..error.rows() {
                    let grad = previous_error.row_mut(b);
                    for (o, &delta) in error.row(b).iter().enumerate() {
                        grad[argmax[b * out_size + o]] += delta;
                    }
                }
            }
            PoolMode::Avg => {
                let size = self.config.size;
                let stride = self.config.stride();
                let share = 1.0 / (size * size) as f32;
                let in_spatial = height * width;
                let out_spatial = out_h * out_w;
                for b in 0..error.rows() {
                    let e = error.row(b);
                    let grad = previous_error.row_mut(b);
                    for c in 0..channels {
                        for oy in 0..out_h {
                            for ox in 0..out_w {
                                let delta = e[c * out_spatial + oy * out_w + ox] * share;
                                let first = c * in_spatial + oy * stride * width + ox * stride;
                                for dy in 0..size {
                                    for dx in 0..size {
                                        grad[first + dy * width + dx] += delta;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(previous_error)
    }

    fn reset(&mut self, batch_size: usize) -> Result<()> {
        if self.output_shape.is_none() {
            return Err(NetworkError::uninitialized("pool", "reset"));
        }
        self.batch_size = batch_size;
        self.argmax = None;
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Pool(PoolSnapshot {
            config: self.config.clone(),
            input_shape: self.input_shape,
        })
    }
}
