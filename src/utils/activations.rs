//! Activation functions for neural networks
//!
//! This module provides the element-wise activation functions layers can
//! apply after their linear transformation:
//! - Linear (identity)
//! - Sigmoid
//! - Tanh
//! - ReLU and Leaky ReLU
//! - ELU
//!
//! Derivatives are evaluated at the pre-activation value `z`, which is what
//! layers cache during the forward pass.

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const LEAKY_RELU_SLOPE: f32 = 0.01;
const ELU_ALPHA: f32 = 1.0;

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative with respect to the pre-activation value.
pub fn sigmoid_prime(z: f32) -> f32 {
    let s = sigmoid(z);
    s * (1.0 - s)
}

/// Element-wise activation selected by name in layer configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Activation {
    Linear,
    #[default]
    Sigmoid,
    Tanh,
    Relu,
    LeakyRelu,
    Elu,
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Relu => "relu",
            Activation::LeakyRelu => "leakyrelu",
            Activation::Elu => "elu",
        }
    }

    pub fn activate(&self, z: f32) -> f32 {
        match self {
            Activation::Linear => z,
            Activation::Sigmoid => sigmoid(z),
            Activation::Tanh => z.tanh(),
            Activation::Relu => z.max(0.0),
            Activation::LeakyRelu => {
                if z > 0.0 {
                    z
                } else {
                    LEAKY_RELU_SLOPE * z
                }
            }
            Activation::Elu => {
                if z > 0.0 {
                    z
                } else {
                    ELU_ALPHA * (z.exp() - 1.0)
                }
            }
        }
    }

    /// Derivative at the pre-activation value `z`.
    pub fn prime(&self, z: f32) -> f32 {
        match self {
            Activation::Linear => 1.0,
            Activation::Sigmoid => sigmoid_prime(z),
            Activation::Tanh => {
                let t = z.tanh();
                1.0 - t * t
            }
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyRelu => {
                if z > 0.0 {
                    1.0
                } else {
                    LEAKY_RELU_SLOPE
                }
            }
            Activation::Elu => {
                if z > 0.0 {
                    1.0
                } else {
                    ELU_ALPHA * z.exp()
                }
            }
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Activation {
    type Error = NetworkError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl From<Activation> for String {
    fn from(activation: Activation) -> Self {
        activation.name().to_string()
    }
}

impl FromStr for Activation {
    type Err = NetworkError;

    fn from_str(name: &str) -> Result<Self> {
        let activation = match name.to_lowercase().as_str() {
            "linear" => Activation::Linear,
            "sigmoid" => Activation::Sigmoid,
            "tanh" => Activation::Tanh,
            "relu" => Activation::Relu,
            "leakyrelu" | "leaky_relu" => Activation::LeakyRelu,
            "elu" => Activation::Elu,
            _ => {
                return Err(NetworkError::invalid_config(format!(
                    "Invalid activation function '{}'. Must be one of: linear, sigmoid, tanh, relu, leakyrelu, elu",
                    name
                )))
            }
        };
        Ok(activation)
    }
}
