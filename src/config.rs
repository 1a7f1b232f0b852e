//! Configuration structures for training
//!
//! This module provides the training hyperparameters a network is trained
//! with, loadable from JSON files. Missing fields take the defaults of
//! [`Network::train`](crate::network::Network::train).

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_epochs() -> usize {
    5000
}

fn default_batches() -> usize {
    1
}

fn default_learning_rate() -> f32 {
    0.1
}

/// Training hyperparameters.
///
/// # Example
///
/// ```json
/// {
///   "epochs": 5000,
///   "batches": 4,
///   "learning_rate": 0.1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Passes over the full dataset list
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Batch size used when it cannot be read from the data
    #[serde(default = "default_batches")]
    pub batches: usize,

    /// SGD step size
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batches: default_batches(),
            learning_rate: default_learning_rate(),
        }
    }
}

/// Loads a training configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use neural_engine::config::load_config;
///
/// let cfg = load_config("config/xor_training.json").unwrap();
/// assert!(cfg.epochs > 0);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TrainingConfig> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &TrainingConfig) -> Result<()> {
    if config.epochs == 0 {
        return Err(NetworkError::invalid_config("epochs must be greater than 0"));
    }

    if config.batches == 0 {
        return Err(NetworkError::invalid_config("batches must be greater than 0"));
    }

    if config.learning_rate <= 0.0 || !config.learning_rate.is_finite() {
        return Err(NetworkError::invalid_config(
            "learning_rate must be a positive number",
        ));
    }

    Ok(())
}
