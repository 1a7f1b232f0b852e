//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait, one implementation per layer kind,
//! and [`NetworkLayer`], the closed set of kinds a network can hold.

mod r#trait;
pub mod activation;
pub mod conv2d;
pub mod dense;
pub mod flatten;
pub mod pool2d;

pub use activation::{ActivationConfig, ActivationLayer, ActivationSnapshot};
pub use conv2d::{Conv2DLayer, ConvConfig, ConvSnapshot};
pub use dense::{DenseConfig, DenseLayer, DenseSnapshot};
pub use flatten::{FlattenConfig, FlattenLayer, FlattenSnapshot};
pub use pool2d::{Pool2DLayer, PoolConfig, PoolMode, PoolSnapshot};
pub use r#trait::Layer;

use crate::architecture::LayerConfig;
use crate::error::{NetworkError, Result};
use crate::matrix::Matrix;
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::SimpleRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag identifying a layer kind in configurations and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Dense,
    Conv,
    Pool,
    Activation,
    Flatten,
}

impl LayerKind {
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Dense,
        LayerKind::Conv,
        LayerKind::Pool,
        LayerKind::Activation,
        LayerKind::Flatten,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            LayerKind::Dense => "dense",
            LayerKind::Conv => "conv",
            LayerKind::Pool => "pool",
            LayerKind::Activation => "activation",
            LayerKind::Flatten => "flatten",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LayerKind {
    type Err = NetworkError;

    fn from_str(tag: &str) -> Result<Self> {
        LayerKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| NetworkError::UnsupportedLayerKind {
                kind: tag.to_string(),
            })
    }
}

/// Serialized form of a single layer, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerSnapshot {
    Dense(DenseSnapshot),
    Conv(ConvSnapshot),
    Pool(PoolSnapshot),
    Activation(ActivationSnapshot),
    Flatten(FlattenSnapshot),
}

impl LayerSnapshot {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerSnapshot::Dense(_) => LayerKind::Dense,
            LayerSnapshot::Conv(_) => LayerKind::Conv,
            LayerSnapshot::Pool(_) => LayerKind::Pool,
            LayerSnapshot::Activation(_) => LayerKind::Activation,
            LayerSnapshot::Flatten(_) => LayerKind::Flatten,
        }
    }
}

/// The layer kinds a network can hold.
#[derive(Debug, Clone)]
pub enum NetworkLayer {
    Dense(DenseLayer),
    Conv(Conv2DLayer),
    Pool(Pool2DLayer),
    Activation(ActivationLayer),
    Flatten(FlattenLayer),
}

impl NetworkLayer {
    pub fn from_config(config: LayerConfig) -> Self {
        match config {
            LayerConfig::Dense(c) => NetworkLayer::Dense(DenseLayer::new(c)),
            LayerConfig::Conv(c) => NetworkLayer::Conv(Conv2DLayer::new(c)),
            LayerConfig::Pool(c) => NetworkLayer::Pool(Pool2DLayer::new(c)),
            LayerConfig::Activation(c) => NetworkLayer::Activation(ActivationLayer::new(c)),
            LayerConfig::Flatten(_) => NetworkLayer::Flatten(FlattenLayer::new()),
        }
    }

    pub fn from_snapshot(snapshot: LayerSnapshot) -> Result<Self> {
        let layer = match snapshot {
            LayerSnapshot::Dense(s) => NetworkLayer::Dense(DenseLayer::from_snapshot(s)?),
            LayerSnapshot::Conv(s) => NetworkLayer::Conv(Conv2DLayer::from_snapshot(s)?),
            LayerSnapshot::Pool(s) => NetworkLayer::Pool(Pool2DLayer::from_snapshot(s)?),
            LayerSnapshot::Activation(s) => {
                NetworkLayer::Activation(ActivationLayer::from_snapshot(s))
            }
            LayerSnapshot::Flatten(s) => NetworkLayer::Flatten(FlattenLayer::from_snapshot(s)),
        };
        Ok(layer)
    }

    pub fn as_dense(&self) -> Option<&DenseLayer> {
        match self {
            NetworkLayer::Dense(layer) => Some(layer),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Layer {
        match self {
            NetworkLayer::Dense(l) => l,
            NetworkLayer::Conv(l) => l,
            NetworkLayer::Pool(l) => l,
            NetworkLayer::Activation(l) => l,
            NetworkLayer::Flatten(l) => l,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Layer {
        match self {
            NetworkLayer::Dense(l) => l,
            NetworkLayer::Conv(l) => l,
            NetworkLayer::Pool(l) => l,
            NetworkLayer::Activation(l) => l,
            NetworkLayer::Flatten(l) => l,
        }
    }
}

impl Layer for NetworkLayer {
    fn kind(&self) -> LayerKind {
        self.inner().kind()
    }

    fn initialize(
        &mut self,
        input_shape: Shape,
        batch_size: usize,
        rng: &mut SimpleRng,
    ) -> Result<Shape> {
        self.inner_mut().initialize(input_shape, batch_size, rng)
    }

    fn output_shape(&self) -> Option<Shape> {
        self.inner().output_shape()
    }

    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix> {
        self.inner_mut().feed_forward(input)
    }

    fn back_propagate(
        &mut self,
        error: &Matrix,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Matrix> {
        self.inner_mut().back_propagate(error, optimizer)
    }

    fn reset(&mut self, batch_size: usize) -> Result<()> {
        self.inner_mut().reset(batch_size)
    }

    fn parameter_count(&self) -> usize {
        self.inner().parameter_count()
    }

    fn snapshot(&self) -> LayerSnapshot {
        self.inner().snapshot()
    }
}

/// Check that `input` holds `batch_size` rows of `features` values each.
pub(crate) fn check_input(
    operation: &'static str,
    input: &Matrix,
    batch_size: usize,
    features: usize,
) -> Result<()> {
    if input.shape() != (batch_size, features) {
        return Err(NetworkError::shape_mismatch(
            operation,
            format!("{}x{}", batch_size, features),
            input,
        ));
    }
    Ok(())
}
