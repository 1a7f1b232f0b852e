//! Serializable network snapshot
//!
//! The persisted layout keeps the output layer apart from the rest of the
//! chain because it is rebuilt as a dense layer on load:
//!
//! ```json
//! {
//!   "type": "NeuralNetwork",
//!   "costFn": "crossentropy",
//!   "input": [2],
//!   "sizes": [[3], [1]],
//!   "layers": [{ "type": "dense", "size": 3, "activation": "sigmoid", ... }],
//!   "output": { "type": "dense", "size": 1, "activation": "sigmoid", ... },
//!   "seed": 42
//! }
//! ```

use crate::architecture::check_layer_tags;
use crate::cost::CostFunction;
use crate::error::{NetworkError, Result};
use crate::layers::{DenseSnapshot, LayerKind, LayerSnapshot};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};

const SNAPSHOT_TYPE: &str = "NeuralNetwork";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "costFn")]
    pub cost: CostFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Shape>,
    /// Output shape of every layer, output layer included. Empty when the
    /// network was never initialized.
    #[serde(default)]
    pub sizes: Vec<Shape>,
    /// Every layer except the output layer
    pub layers: Vec<LayerSnapshot>,
    #[serde(with = "dense_output")]
    pub output: DenseSnapshot,
    /// Initialization seed for layers stored without parameters
    #[serde(default)]
    pub seed: u64,
}

impl NetworkSnapshot {
    pub fn new(
        cost: CostFunction,
        input: Option<Shape>,
        sizes: Vec<Shape>,
        layers: Vec<LayerSnapshot>,
        output: DenseSnapshot,
    ) -> Self {
        Self {
            kind: SNAPSHOT_TYPE.to_string(),
            cost,
            input,
            sizes,
            layers,
            output,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a snapshot, rejecting unknown layer kinds by name.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(layers) = value.get("layers").and_then(|l| l.as_array()) {
            check_layer_tags(layers)?;
        }
        if let Some(output) = value.get("output") {
            check_layer_tags(std::slice::from_ref(output))?;
            if output.get("type").and_then(|t| t.as_str()) != Some(LayerKind::Dense.tag()) {
                return Err(NetworkError::invalid_config("output layer must be dense"));
            }
        }
        if let Some(cost) = value.get("costFn").and_then(|c| c.as_str()) {
            cost.parse::<CostFunction>()?;
        }

        let snapshot: NetworkSnapshot = serde_json::from_value(value)?;
        if snapshot.kind != SNAPSHOT_TYPE {
            return Err(NetworkError::invalid_config(format!(
                "expected snapshot type '{}', got '{}'",
                SNAPSHOT_TYPE, snapshot.kind
            )));
        }
        Ok(snapshot)
    }
}

/// The output layer is stored with its `type` tag like any other layer.
mod dense_output {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        output: &DenseSnapshot,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        LayerSnapshot::Dense(output.clone()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<DenseSnapshot, D::Error> {
        match LayerSnapshot::deserialize(deserializer)? {
            LayerSnapshot::Dense(dense) => Ok(dense),
            other => Err(serde::de::Error::custom(format!(
                "output layer must be dense, got {}",
                other.kind()
            ))),
        }
    }
}
