//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2DLayer that slides a bank of square kernels
//! over (optionally zero-padded) image data, producing one output channel
//! per kernel.

use crate::error::{NetworkError, Result};
use crate::layers::Layer;
use crate::layers::{check_input, LayerKind, LayerSnapshot};
use crate::matrix::Matrix;
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::SimpleRng;
use serde::{Deserialize, Serialize};

fn default_stride() -> usize {
    1
}

/// Static configuration of a convolution layer.
///
/// ```json
/// { "type": "conv", "filters": 8, "kernel_size": 3, "stride": 1, "padding": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvConfig {
    /// Number of kernels, i.e. output channels
    pub filters: usize,
    /// Side of the square kernel
    pub kernel_size: usize,
    #[serde(default = "default_stride")]
    pub stride: usize,
    /// Zero-padding applied symmetrically on every side
    #[serde(default)]
    pub padding: usize,
    /// Skip the per-filter bias
    #[serde(default)]
    pub unbiased: bool,
}

impl ConvConfig {
    pub fn new(filters: usize, kernel_size: usize) -> Self {
        Self {
            filters,
            kernel_size,
            stride: 1,
            padding: 0,
            unbiased: false,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn unbiased(mut self) -> Self {
        self.unbiased = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvSnapshot {
    #[serde(flatten)]
    pub config: ConvConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Shape>,
    /// `filters × (in_channels · kernel_size²)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernels: Option<Matrix>,
    /// `1 × filters`, absent for unbiased layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biases: Option<Matrix>,
}

/// Input geometry resolved at initialize time.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    channels: usize,
    height: usize,
    width: usize,
    padded_height: usize,
    padded_width: usize,
    out_height: usize,
    out_width: usize,
}

impl Geometry {
    fn padded_spatial(&self) -> usize {
        self.padded_height * self.padded_width
    }

    fn out_spatial(&self) -> usize {
        self.out_height * self.out_width
    }
}

/// 2D Convolutional layer with learnable kernels.
///
/// Kernels are stored as `[filter][channel][ky][kx]`, one filter per row of
/// the kernel matrix. The zero-padded input of the last forward pass is
/// cached for the backward pass.
#[derive(Debug, Clone)]
pub struct Conv2DLayer {
    config: ConvConfig,
    input_shape: Option<Shape>,
    geometry: Option<Geometry>,
    batch_size: usize,
    kernels: Option<Matrix>,
    biases: Option<Matrix>,
    padded_input: Option<Matrix>,
}

impl Conv2DLayer {
    pub fn new(config: ConvConfig) -> Self {
        Self {
            config,
            input_shape: None,
            geometry: None,
            batch_size: 0,
            kernels: None,
            biases: None,
            padded_input: None,
        }
    }

    pub fn from_snapshot(snapshot: ConvSnapshot) -> Result<Self> {
        let mut layer = Self::new(snapshot.config);
        if let Some(kernels) = &snapshot.kernels {
            if kernels.rows() != layer.config.filters {
                return Err(NetworkError::shape_mismatch(
                    "conv snapshot",
                    format!("{} kernel rows", layer.config.filters),
                    kernels,
                ));
            }
        }
        if let Some(biases) = &snapshot.biases {
            if biases.shape() != (1, layer.config.filters) {
                return Err(NetworkError::shape_mismatch(
                    "conv snapshot",
                    format!("1x{}", layer.config.filters),
                    biases,
                ));
            }
        }
        layer.geometry = snapshot
            .input_shape
            .map(|shape| layer.resolve_geometry(shape))
            .transpose()?;
        layer.kernels = snapshot.kernels;
        layer.biases = snapshot.biases;
        layer.input_shape = snapshot.input_shape;
        Ok(layer)
    }

    pub fn config(&self) -> &ConvConfig {
        &self.config
    }

    pub fn kernels(&self) -> Option<&Matrix> {
        self.kernels.as_ref()
    }

    pub fn biases(&self) -> Option<&Matrix> {
        self.biases.as_ref()
    }

    fn resolve_geometry(&self, input_shape: Shape) -> Result<Geometry> {
        let (channels, height, width) = match input_shape {
            Shape::Image {
                channels,
                height,
                width,
            } => (channels, height, width),
            other => {
                return Err(NetworkError::shape_mismatch(
                    "conv initialize",
                    "image input [channels, height, width]",
                    other,
                ))
            }
        };
        let k = self.config.kernel_size;
        if self.config.filters == 0 || k == 0 || self.config.stride == 0 {
            return Err(NetworkError::invalid_config(
                "conv layer needs filters, kernel_size and stride greater than 0",
            ));
        }

        let padded_height = height + 2 * self.config.padding;
        let padded_width = width + 2 * self.config.padding;
        if padded_height < k || padded_width < k {
            return Err(NetworkError::shape_mismatch(
                "conv initialize",
                format!("padded input of at least {}x{}", k, k),
                format!("{}x{}", padded_height, padded_width),
            ));
        }

        Ok(Geometry {
            channels,
            height,
            width,
            padded_height,
            padded_width,
            out_height: (padded_height - k) / self.config.stride + 1,
            out_width: (padded_width - k) / self.config.stride + 1,
        })
    }

    fn pad(&self, input: &Matrix, g: &Geometry) -> Matrix {
        let p = self.config.padding;
        let in_spatial = g.height * g.width;
        let mut padded = Matrix::with(input.rows(), g.channels * g.padded_spatial());
        for b in 0..input.rows() {
            let src = input.row(b);
            let dst = padded.row_mut(b);
            for c in 0..g.channels {
                for y in 0..g.height {
                    let s = c * in_spatial + y * g.width;
                    let d = c * g.padded_spatial() + (y + p) * g.padded_width + p;
                    dst[d..d + g.width].copy_from_slice(&src[s..s + g.width]);
                }
            }
        }
        padded
    }
}

impl Layer for Conv2DLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Conv
    }

    fn initialize(
        &mut self,
        input_shape: Shape,
        batch_size: usize,
        rng: &mut SimpleRng,
    ) -> Result<Shape> {
        let g = self.resolve_geometry(input_shape)?;
        let k = self.config.kernel_size;
        let kernel_len = g.channels * k * k;

        match &self.kernels {
            Some(kernels) if kernels.cols() != kernel_len => {
                return Err(NetworkError::shape_mismatch(
                    "conv initialize",
                    format!("{} input channels", kernels.cols() / (k * k)),
                    input_shape,
                ));
            }
            Some(_) => {}
            None => {
                // Xavier initialization adapted for convolutions:
                // fan_in = in_channels * k², fan_out = filters * k²
                let mut kernels = Matrix::with(self.config.filters, kernel_len);
                rng.fill_xavier(kernels.data_mut(), kernel_len, self.config.filters * k * k);
                self.kernels = Some(kernels);
                if !self.config.unbiased {
                    self.biases = Some(Matrix::with(1, self.config.filters));
                }
            }
        }

        self.input_shape = Some(input_shape);
        self.geometry = Some(g);
        self.reset(batch_size)?;
        Ok(Shape::image(self.config.filters, g.out_height, g.out_width))
    }

    fn output_shape(&self) -> Option<Shape> {
        self.geometry
            .map(|g| Shape::image(self.config.filters, g.out_height, g.out_width))
    }

    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix> {
        let (g, kernels) = match (&self.geometry, &self.kernels) {
            (Some(g), Some(kernels)) if self.batch_size > 0 => (*g, kernels),
            _ => return Err(NetworkError::uninitialized("conv", "feed_forward")),
        };
        check_input(
            "conv feed_forward",
            &input,
            self.batch_size,
            g.channels * g.height * g.width,
        )?;

        let k = self.config.kernel_size;
        let stride = self.config.stride;
        let padded = self.pad(&input, &g);
        let mut output = Matrix::with(input.rows(), self.config.filters * g.out_spatial());

        for b in 0..input.rows() {
            let x = padded.row(b);
            let out = output.row_mut(b);
            for f in 0..self.config.filters {
                let kernel = kernels.row(f);
                let bias = self.biases.as_ref().map_or(0.0, |bs| bs.get(0, f));
                let out_base = f * g.out_spatial();

                for oy in 0..g.out_height {
                    for ox in 0..g.out_width {
                        let mut sum = bias;
                        for c in 0..g.channels {
                            let x_base = c * g.padded_spatial();
                            let k_base = c * k * k;
                            for ky in 0..k {
                                let row = x_base + (oy * stride + ky) * g.padded_width + ox * stride;
                                for kx in 0..k {
                                    sum += x[row + kx] * kernel[k_base + ky * k + kx];
                                }
                            }
                        }
                        out[out_base + oy * g.out_width + ox] = sum;
                    }
                }
            }
        }

        self.padded_input = Some(padded);
        Ok(output)
    }

    /// Kernel gradient: correlation of the padded input with the error.
    /// Input gradient: the error scattered back through each kernel tap,
    /// which is the full convolution of the error with the flipped kernel,
    /// cropped to the unpadded input.
    fn back_propagate(
        &mut self,
        error: &Matrix,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        let (g, padded) = match (&self.geometry, &self.padded_input) {
            (Some(g), Some(padded)) => (*g, padded),
            _ => return Err(NetworkError::uninitialized("conv", "back_propagate")),
        };
        let kernels = match self.kernels.as_mut() {
            Some(kernels) => kernels,
            None => return Err(NetworkError::uninitialized("conv", "back_propagate")),
        };
        let filters = self.config.filters;
        if error.shape() != (padded.rows(), filters * g.out_spatial()) {
            return Err(NetworkError::shape_mismatch(
                "conv back_propagate",
                format!("{}x{}", padded.rows(), filters * g.out_spatial()),
                error,
            ));
        }

        let k = self.config.kernel_size;
        let stride = self.config.stride;
        let mut kernel_gradient = Matrix::with(filters, kernels.cols());
        let mut bias_gradient = Matrix::with(1, filters);
        let mut padded_gradient = Matrix::with(padded.rows(), padded.cols());

        for b in 0..padded.rows() {
            let x = padded.row(b);
            let e = error.row(b);
            let dx = padded_gradient.row_mut(b);
            for f in 0..filters {
                let kernel = kernels.row(f);
                let dk = kernel_gradient.row_mut(f);
                let e_base = f * g.out_spatial();

                for oy in 0..g.out_height {
                    for ox in 0..g.out_width {
                        let delta = e[e_base + oy * g.out_width + ox];
                        bias_gradient.data_mut()[f] += delta;
                        if delta == 0.0 {
                            continue;
                        }
                        for c in 0..g.channels {
                            let x_base = c * g.padded_spatial();
                            let k_base = c * k * k;
                            for ky in 0..k {
                                let row = x_base + (oy * stride + ky) * g.padded_width + ox * stride;
                                for kx in 0..k {
                                    dk[k_base + ky * k + kx] += delta * x[row + kx];
                                    dx[row + kx] += delta * kernel[k_base + ky * k + kx];
                                }
                            }
                        }
                    }
                }
            }
        }

        // Crop the padding off the input gradient.
        let p = self.config.padding;
        let in_spatial = g.height * g.width;
        let mut previous_error = Matrix::with(padded.rows(), g.channels * in_spatial);
        for b in 0..padded.rows() {
            let src = padded_gradient.row(b);
            let dst = previous_error.row_mut(b);
            for c in 0..g.channels {
                for y in 0..g.height {
                    let s = c * g.padded_spatial() + (y + p) * g.padded_width + p;
                    let d = c * in_spatial + y * g.width;
                    dst[d..d + g.width].copy_from_slice(&src[s..s + g.width]);
                }
            }
        }

        optimizer.update(kernels.data_mut(), kernel_gradient.data());
        if let Some(biases) = self.biases.as_mut() {
            optimizer.update(biases.data_mut(), bias_gradient.data());
        }

        Ok(previous_error)
    }

    fn reset(&mut self, batch_size: usize) -> Result<()> {
        if self.geometry.is_none() {
            return Err(NetworkError::uninitialized("conv", "reset"));
        }
        self.batch_size = batch_size;
        self.padded_input = None;
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        self.kernels.as_ref().map_or(0, Matrix::len) + self.biases.as_ref().map_or(0, Matrix::len)
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Conv(ConvSnapshot {
            config: self.config.clone(),
            input_shape: self.input_shape,
            kernels: self.kernels.clone(),
            biases: self.biases.clone(),
        })
    }
}
