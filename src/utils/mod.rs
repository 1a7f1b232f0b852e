//! Shared utilities for the engine
//!
//! This module provides the seeded RNG used for weight initialization and
//! the activation functions shared by dense and activation layers.

pub mod activations;
pub mod rng;

pub use activations::Activation;
pub use rng::SimpleRng;
