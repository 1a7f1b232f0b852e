//! Public network handle
//!
//! [`Network`] wraps an execution backend. The default is [`CpuBackend`];
//! any other [`Backend`] is passed in explicitly through
//! [`Network::with_backend`].
//!
//! # Example
//!
//! ```
//! use neural_engine::architecture::{LayerConfig, NetworkConfig};
//! use neural_engine::layers::DenseConfig;
//! use neural_engine::{DataSet, Matrix, Network};
//!
//! let config = NetworkConfig::new(vec![
//!     LayerConfig::Dense(DenseConfig::new(3)),
//!     LayerConfig::Dense(DenseConfig::new(1)),
//! ])
//! .silent(true);
//! let mut network = Network::new(config).unwrap();
//!
//! let inputs = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
//! let outputs = Matrix::from_rows(&[vec![1.0], vec![1.0]]).unwrap();
//! network
//!     .train(&[DataSet::new(inputs, outputs)], 10, 2, 0.1)
//!     .unwrap();
//!
//! let prediction = network.predict(&Matrix::with(1, 2)).unwrap();
//! assert_eq!(prediction.shape(), (1, 1));
//! ```

use crate::architecture::NetworkConfig;
use crate::backend::{Backend, CpuBackend, DataSet};
use crate::config::TrainingConfig;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::shape::Shape;
use crate::snapshot::NetworkSnapshot;

#[derive(Debug, Clone)]
pub struct Network<B: Backend = CpuBackend> {
    backend: B,
}

impl Network<CpuBackend> {
    /// Build a CPU-backed network. Fails with `InvalidConfig` when the layer
    /// list is empty or does not end in a dense layer.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        Ok(Self {
            backend: CpuBackend::new(config)?,
        })
    }
}

impl<B: Backend> Network<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn initialize(&mut self, input_shape: Shape, batch_size: usize) -> Result<()> {
        self.backend.initialize(input_shape, batch_size)
    }

    pub fn train(
        &mut self,
        datasets: &[DataSet],
        epochs: usize,
        batches: usize,
        rate: f32,
    ) -> Result<()> {
        self.backend.train(datasets, epochs, batches, rate)
    }

    /// Train with the hyperparameters of a loaded [`TrainingConfig`].
    pub fn train_with(&mut self, datasets: &[DataSet], config: &TrainingConfig) -> Result<()> {
        self.backend
            .train(datasets, config.epochs, config.batches, config.learning_rate)
    }

    pub fn predict(&mut self, input: &Matrix) -> Result<Matrix> {
        self.backend.predict(input)
    }

    /// Predict a single sample given as a flat slice.
    pub fn predict_sample(&mut self, sample: &[f32]) -> Result<Vec<f32>> {
        let input = Matrix::create(sample.to_vec(), 1, sample.len())?;
        Ok(self.backend.predict(&input)?.into_vec())
    }

    pub fn evaluate(&mut self, datasets: &[DataSet]) -> Result<f32> {
        self.backend.evaluate(datasets)
    }

    pub fn to_snapshot(&self) -> Result<NetworkSnapshot> {
        self.backend.snapshot()
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_snapshot()?.to_json()
    }

    pub fn from_snapshot(snapshot: NetworkSnapshot) -> Result<Self> {
        Ok(Self {
            backend: B::from_snapshot(snapshot)?,
        })
    }

    /// Rebuild a network from [`to_json`](Self::to_json) output. Unknown
    /// layer kinds fail with `UnsupportedLayerKind`.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_snapshot(NetworkSnapshot::from_json(json)?)
    }
}
