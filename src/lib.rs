//! Neural network training and inference engine
//!
//! This library builds a layered network from a declarative configuration,
//! trains it with plain SGD, runs inference, and snapshots trained networks
//! to JSON.
//!
//! # Modules
//!
//! - `matrix`: Row-major `f32` buffer every layer computes on
//! - `layers`: Layer trait and implementations (Dense, Conv2D, Pool2D, Activation, Flatten)
//! - `cost`: Cost functions seeding the backward pass (cross-entropy, hinge)
//! - `optimizers`: Parameter update rules (SGD)
//! - `backend`: Backend trait and the CPU orchestrator
//! - `network`: Public network handle
//! - `snapshot`: Serializable network snapshot
//! - `architecture`: Network configuration and loading
//! - `config`: Training hyperparameter configuration
//! - `utils`: Shared utilities (RNG, activation functions)

pub mod architecture;
pub mod backend;
pub mod config;
pub mod cost;
pub mod error;
pub mod layers;
pub mod matrix;
pub mod network;
pub mod optimizers;
pub mod shape;
pub mod snapshot;
pub mod utils;

pub use architecture::{LayerConfig, NetworkConfig};
pub use backend::{Backend, CpuBackend, DataSet};
pub use cost::CostFunction;
pub use error::{NetworkError, Result};
pub use matrix::Matrix;
pub use network::Network;
pub use shape::Shape;
pub use snapshot::NetworkSnapshot;
