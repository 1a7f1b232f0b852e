//! Cost functions that seed the backward pass
//!
//! A cost function is consulted only at the output layer: `prime` is applied
//! element-wise over the output activation to build the first error buffer,
//! and `cost` is used for progress reporting.

use crate::error::{NetworkError, Result};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const EPSILON: f32 = 1e-7;

/// Loss/gradient pair selected by name at network construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CostFunction {
    /// Binary cross-entropy over each output unit.
    #[default]
    CrossEntropy,
    /// Hinge loss, targets expected in {-1, 1}.
    Hinge,
}

impl CostFunction {
    pub fn name(&self) -> &'static str {
        match self {
            CostFunction::CrossEntropy => "crossentropy",
            CostFunction::Hinge => "hinge",
        }
    }

    /// Loss contribution of a single output unit.
    pub fn cost(&self, predicted: f32, target: f32) -> f32 {
        match self {
            CostFunction::CrossEntropy => {
                let p = predicted.clamp(EPSILON, 1.0 - EPSILON);
                -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
            }
            CostFunction::Hinge => (1.0 - target * predicted).max(0.0),
        }
    }

    /// Derivative of [`cost`](Self::cost) with respect to `predicted`.
    ///
    /// For cross-entropy the denominator is clamped at `1e-7`. A sigmoid
    /// output saturated to exactly 0 or 1 therefore passes no gradient to
    /// its dense layer, even when it is wrong.
    pub fn prime(&self, predicted: f32, target: f32) -> f32 {
        match self {
            CostFunction::CrossEntropy => {
                let denominator = (predicted * (1.0 - predicted)).max(EPSILON);
                (predicted - target) / denominator
            }
            CostFunction::Hinge => {
                if target * predicted < 1.0 {
                    -target
                } else {
                    0.0
                }
            }
        }
    }

    /// Seed error buffer for the output layer.
    pub fn error(&self, predicted: &Matrix, target: &Matrix) -> Result<Matrix> {
        predicted.zip_map(target, "cost prime", |p, t| self.prime(p, t))
    }

    /// Summed cost divided by the number of samples (rows).
    pub fn loss(&self, predicted: &Matrix, target: &Matrix) -> Result<f32> {
        let costs = predicted.zip_map(target, "cost", |p, t| self.cost(p, t))?;
        Ok(costs.sum() / predicted.rows().max(1) as f32)
    }
}

impl fmt::Display for CostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for CostFunction {
    type Error = NetworkError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl From<CostFunction> for String {
    fn from(cost: CostFunction) -> Self {
        cost.name().to_string()
    }
}

impl FromStr for CostFunction {
    type Err = NetworkError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "crossentropy" => Ok(CostFunction::CrossEntropy),
            "hinge" => Ok(CostFunction::Hinge),
            _ => Err(NetworkError::invalid_config(format!(
                "Invalid cost function '{}'. Must be one of: crossentropy, hinge",
                name
            ))),
        }
    }
}
