//! Per-sample shapes carried across layer boundaries

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a single sample. The batch dimension is never part of a shape;
/// it lives in the row count of the buffers.
///
/// Serialized as the list of its dimensions: `[n]` for flat data and
/// `[channels, height, width]` for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub enum Shape {
    Flat(usize),
    Image {
        channels: usize,
        height: usize,
        width: usize,
    },
}

impl Shape {
    pub fn image(channels: usize, height: usize, width: usize) -> Self {
        Shape::Image {
            channels,
            height,
            width,
        }
    }

    /// Number of values per sample.
    pub fn size(&self) -> usize {
        match *self {
            Shape::Flat(n) => n,
            Shape::Image {
                channels,
                height,
                width,
            } => channels * height * width,
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        match *self {
            Shape::Flat(n) => vec![n],
            Shape::Image {
                channels,
                height,
                width,
            } => vec![channels, height, width],
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Shape::Flat(n) => write!(f, "[{}]", n),
            Shape::Image {
                channels,
                height,
                width,
            } => write!(f, "[{}, {}, {}]", channels, height, width),
        }
    }
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = NetworkError;

    fn try_from(dims: Vec<usize>) -> Result<Self> {
        match dims.as_slice() {
            [n] => Ok(Shape::Flat(*n)),
            [c, h, w] => Ok(Shape::image(*c, *h, *w)),
            _ => Err(NetworkError::invalid_config(format!(
                "shape must have 1 or 3 dimensions, got {:?}",
                dims
            ))),
        }
    }
}

impl From<Shape> for Vec<usize> {
    fn from(shape: Shape) -> Self {
        shape.dims()
    }
}
