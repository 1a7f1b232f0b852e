//! Architecture configuration structures
//!
//! This module provides the declarative description of a network: the input
//! shape, the ordered layer list, the cost function and the logging switch.
//! Configurations can be built in code or loaded from JSON files.

use crate::cost::CostFunction;
use crate::error::{NetworkError, Result};
use crate::layers::{ActivationConfig, ConvConfig, DenseConfig, FlattenConfig, PoolConfig};
use crate::layers::LayerKind;
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a single layer, tagged by `type`.
///
/// # Examples
///
/// ```json
/// { "type": "dense", "size": 3, "activation": "sigmoid" }
/// ```
///
/// ```json
/// { "type": "conv", "filters": 8, "kernel_size": 3, "padding": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerConfig {
    Dense(DenseConfig),
    Conv(ConvConfig),
    Pool(PoolConfig),
    Activation(ActivationConfig),
    Flatten(FlattenConfig),
}

impl LayerConfig {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerConfig::Dense(_) => LayerKind::Dense,
            LayerConfig::Conv(_) => LayerKind::Conv,
            LayerConfig::Pool(_) => LayerKind::Pool,
            LayerConfig::Activation(_) => LayerKind::Activation,
            LayerConfig::Flatten(_) => LayerKind::Flatten,
        }
    }
}

fn default_seed() -> u64 {
    0
}

/// Configuration for the entire network.
///
/// # Example
///
/// ```json
/// {
///   "input": [2],
///   "layers": [
///     { "type": "dense", "size": 3, "activation": "sigmoid" },
///     { "type": "dense", "size": 1, "activation": "sigmoid" }
///   ],
///   "cost": "crossentropy",
///   "silent": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-sample input shape; derived from the first dataset when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Shape>,
    /// Layers in forward order; the last one must be dense
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub cost: CostFunction,
    /// Suppress training progress logs
    #[serde(default)]
    pub silent: bool,
    /// Seed for weight initialization
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl NetworkConfig {
    pub fn new(layers: Vec<LayerConfig>) -> Self {
        Self {
            input: None,
            layers,
            cost: CostFunction::default(),
            silent: false,
            seed: default_seed(),
        }
    }

    pub fn with_input(mut self, input: Shape) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_cost(mut self, cost: CostFunction) -> Self {
        self.cost = cost;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Parse a network configuration from JSON text.
///
/// Every layer's `type` tag is checked before typed decoding so an unknown
/// kind is reported as `UnsupportedLayerKind`, and an unknown cost name as
/// `InvalidConfig`.
pub fn parse_architecture(json: &str) -> Result<NetworkConfig> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if let Some(layers) = value.get("layers").and_then(|l| l.as_array()) {
        check_layer_tags(layers)?;
    }
    if let Some(cost) = value.get("cost").and_then(|c| c.as_str()) {
        cost.parse::<CostFunction>()?;
    }
    let config: NetworkConfig = serde_json::from_value(value)?;
    validate_architecture(&config)?;
    Ok(config)
}

/// Loads a network configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use neural_engine::architecture::load_architecture;
///
/// let config = load_architecture("config/xor.json").unwrap();
/// assert!(!config.layers.is_empty());
/// ```
pub fn load_architecture(path: impl AsRef<Path>) -> Result<NetworkConfig> {
    let contents = fs::read_to_string(path)?;
    parse_architecture(&contents)
}

/// Fail with `UnsupportedLayerKind` on the first layer whose `type` tag is
/// not a known kind.
pub(crate) fn check_layer_tags(layers: &[serde_json::Value]) -> Result<()> {
    for (index, layer) in layers.iter().enumerate() {
        let tag = layer.get("type").and_then(|t| t.as_str()).ok_or_else(|| {
            NetworkError::invalid_config(format!("Layer {}: missing 'type' tag", index))
        })?;
        tag.parse::<LayerKind>()?;
    }
    Ok(())
}

/// Validates static layer parameters.
///
/// Shape compatibility between layers needs the input shape and is checked
/// when the network is initialized.
pub fn validate_architecture(config: &NetworkConfig) -> Result<()> {
    if config.layers.is_empty() {
        return Err(NetworkError::invalid_config(
            "Architecture must contain at least one layer",
        ));
    }
    match config.layers.last() {
        Some(LayerConfig::Dense(_)) => {}
        Some(other) => {
            return Err(NetworkError::invalid_config(format!(
                "Output layer must be dense, got {}",
                other.kind()
            )))
        }
        None => {}
    }

    for (index, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, index)?;
    }

    if let Some(input) = config.input {
        if input.size() == 0 {
            return Err(NetworkError::invalid_config("input shape must not be empty"));
        }
    }

    Ok(())
}

fn validate_layer(layer: &LayerConfig, index: usize) -> Result<()> {
    let fail = |message: &str| -> Result<()> {
        Err(NetworkError::invalid_config(format!(
            "Layer {}: {}",
            index, message
        )))
    };

    match layer {
        LayerConfig::Dense(c) if c.size == 0 => fail("size must be greater than 0"),
        LayerConfig::Conv(c) if c.filters == 0 => fail("filters must be greater than 0"),
        LayerConfig::Conv(c) if c.kernel_size == 0 => fail("kernel_size must be greater than 0"),
        LayerConfig::Conv(c) if c.stride == 0 => fail("stride must be greater than 0"),
        LayerConfig::Pool(c) if c.size == 0 => fail("size must be greater than 0"),
        LayerConfig::Pool(c) if c.stride() == 0 => fail("stride must be greater than 0"),
        _ => Ok(()),
    }
}
