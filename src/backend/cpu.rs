//! CPU backend: the layer-chain orchestrator
//!
//! Owns the ordered layers (the dense output layer last), threads buffers
//! through them forward and backward, and seeds the backward pass from the
//! cost function.

use crate::architecture::{validate_architecture, NetworkConfig};
use crate::backend::{Backend, DataSet};
use crate::cost::CostFunction;
use crate::error::{NetworkError, Result};
use crate::layers::{DenseLayer, Layer, LayerSnapshot, NetworkLayer};
use crate::matrix::Matrix;
use crate::optimizers::{Optimizer, SGD};
use crate::shape::Shape;
use crate::snapshot::NetworkSnapshot;
use crate::utils::SimpleRng;
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unconfigured,
    Initialized { input: Shape, batch_size: usize },
}

/// Single-threaded reference backend.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    input: Option<Shape>,
    layers: Vec<NetworkLayer>,
    cost: CostFunction,
    silent: bool,
    seed: u64,
    rng: SimpleRng,
    state: State,
}

impl CpuBackend {
    pub fn new(config: NetworkConfig) -> Result<Self> {
        validate_architecture(&config)?;
        Ok(Self {
            input: config.input,
            layers: config
                .layers
                .into_iter()
                .map(NetworkLayer::from_config)
                .collect(),
            cost: config.cost,
            silent: config.silent,
            seed: config.seed,
            rng: SimpleRng::new(config.seed),
            state: State::Unconfigured,
        })
    }

    pub fn cost(&self) -> CostFunction {
        self.cost
    }

    pub fn input_shape(&self) -> Option<Shape> {
        self.input
    }

    pub fn layers(&self) -> &[NetworkLayer] {
        &self.layers
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized { .. })
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// The dense output layer.
    pub fn output(&self) -> Result<&DenseLayer> {
        self.layers
            .last()
            .and_then(NetworkLayer::as_dense)
            .ok_or_else(|| NetworkError::invalid_config("output layer must be dense"))
    }

    /// Weight buffers of every parameterized layer, in layer order.
    pub fn weights(&self) -> Vec<&Matrix> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                NetworkLayer::Dense(dense) => dense.weights(),
                NetworkLayer::Conv(conv) => conv.kernels(),
                _ => None,
            })
            .collect()
    }

    /// Bias buffers of every parameterized layer; unbiased layers are skipped.
    pub fn biases(&self) -> Vec<&Matrix> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                NetworkLayer::Dense(dense) => dense.biases(),
                NetworkLayer::Conv(conv) => conv.biases(),
                _ => None,
            })
            .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    fn feed_forward(&mut self, input: Matrix) -> Result<Matrix> {
        self.layers
            .iter_mut()
            .try_fold(input, |buffer, layer| layer.feed_forward(buffer))
    }

    fn back_propagate(&mut self, error: Matrix, optimizer: &mut dyn Optimizer) -> Result<()> {
        self.layers
            .iter_mut()
            .rev()
            .try_fold(error, |buffer, layer| layer.back_propagate(&buffer, optimizer))?;
        Ok(())
    }

    /// Make the chain ready for `rows` samples of `features` values.
    fn prepare(&mut self, operation: &'static str, rows: usize, features: usize) -> Result<()> {
        let input = match self.state {
            State::Initialized { input, .. } => input,
            State::Unconfigured => self
                .input
                .ok_or_else(|| NetworkError::uninitialized("network", operation))?,
        };
        if input.size() != features {
            return Err(NetworkError::shape_mismatch(
                operation,
                format!("{} input features", input.size()),
                features,
            ));
        }

        match self.state {
            State::Initialized { batch_size, .. } if batch_size == rows => {}
            State::Initialized { .. } => {
                for layer in &mut self.layers {
                    layer.reset(rows)?;
                }
                self.state = State::Initialized {
                    input,
                    batch_size: rows,
                };
            }
            State::Unconfigured => self.initialize(input, rows)?,
        }
        Ok(())
    }

    fn check_dataset(&self, dataset: &DataSet, input: Shape, batch_size: usize) -> Result<()> {
        if dataset.inputs.shape() != (batch_size, input.size()) {
            return Err(NetworkError::shape_mismatch(
                "dataset inputs",
                format!("{}x{}", batch_size, input.size()),
                &dataset.inputs,
            ));
        }
        let units = self.output()?.config().size;
        if dataset.outputs.shape() != (batch_size, units) {
            return Err(NetworkError::shape_mismatch(
                "dataset outputs",
                format!("{}x{}", batch_size, units),
                &dataset.outputs,
            ));
        }
        Ok(())
    }
}

impl Backend for CpuBackend {
    fn initialize(&mut self, input_shape: Shape, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(NetworkError::invalid_config("batch size must be greater than 0"));
        }

        // Walk a copy so a rejected shape leaves the chain untouched.
        let mut layers = self.layers.clone();
        let mut rng = self.rng.clone();
        let mut shape = input_shape;
        for (index, layer) in layers.iter_mut().enumerate() {
            shape = layer.initialize(shape, batch_size, &mut rng)?;
            debug!("layer {} ({}): output shape {}", index, layer.kind(), shape);
        }

        self.layers = layers;
        self.rng = rng;
        self.input = Some(input_shape);
        self.state = State::Initialized {
            input: input_shape,
            batch_size,
        };
        Ok(())
    }

    fn train(
        &mut self,
        datasets: &[DataSet],
        epochs: usize,
        batches: usize,
        rate: f32,
    ) -> Result<()> {
        let first = datasets
            .first()
            .ok_or_else(|| NetworkError::invalid_config("train needs at least one dataset"))?;

        let batch_size = match first.batch_size() {
            0 => batches,
            rows => rows,
        };
        if batch_size != batches && !self.silent {
            debug!(
                "batch size {} taken from the first dataset instead of {}",
                batch_size, batches
            );
        }

        let features = first.inputs.cols();
        let input = match self.input {
            Some(shape) if shape.size() == features => shape,
            Some(shape) => {
                return Err(NetworkError::shape_mismatch(
                    "train",
                    format!("{} input features", shape.size()),
                    features,
                ))
            }
            None => Shape::Flat(features),
        };

        self.initialize(input, batch_size)?;
        for dataset in datasets {
            self.check_dataset(dataset, input, batch_size)?;
        }

        if !self.silent {
            info!(
                "Training for {} epochs on {} dataset(s), batch size {}, rate {}",
                epochs,
                datasets.len(),
                batch_size,
                rate
            );
        }

        let mut optimizer = SGD::new(rate);
        for epoch in 0..epochs {
            let mut total = 0.0;
            for dataset in datasets {
                let output = self.feed_forward(dataset.inputs.clone())?;
                total += self.cost.loss(&output, &dataset.outputs)?;
                let error = self.cost.error(&output, &dataset.outputs)?;
                self.back_propagate(error, &mut optimizer)?;
            }
            if !self.silent {
                debug!(
                    "Epoch {}/{}: cost = {:.6}",
                    epoch + 1,
                    epochs,
                    total / datasets.len() as f32
                );
            }
        }

        if !self.silent {
            info!("Training complete");
        }
        Ok(())
    }

    fn predict(&mut self, input: &Matrix) -> Result<Matrix> {
        self.prepare("predict", input.rows(), input.cols())?;
        self.feed_forward(input.clone())
    }

    fn evaluate(&mut self, datasets: &[DataSet]) -> Result<f32> {
        if datasets.is_empty() {
            return Err(NetworkError::invalid_config(
                "evaluate needs at least one dataset",
            ));
        }
        let mut total = 0.0;
        for dataset in datasets {
            let output = self.predict(&dataset.inputs)?;
            total += self.cost.loss(&output, &dataset.outputs)?;
        }
        Ok(total / datasets.len() as f32)
    }

    fn snapshot(&self) -> Result<NetworkSnapshot> {
        let (output, hidden) = self
            .layers
            .split_last()
            .ok_or_else(|| NetworkError::invalid_config("network has no layers"))?;
        let output = match output.snapshot() {
            LayerSnapshot::Dense(dense) => dense,
            other => {
                return Err(NetworkError::invalid_config(format!(
                    "output layer must be dense, got {}",
                    other.kind()
                )))
            }
        };

        Ok(NetworkSnapshot::new(
            self.cost,
            self.input,
            self.layers
                .iter()
                .map(Layer::output_shape)
                .collect::<Option<Vec<_>>>()
                .unwrap_or_default(),
            hidden.iter().map(Layer::snapshot).collect(),
            output,
        )
        .with_seed(self.seed))
    }

    fn from_snapshot(snapshot: NetworkSnapshot) -> Result<Self> {
        let mut layers = snapshot
            .layers
            .into_iter()
            .map(NetworkLayer::from_snapshot)
            .collect::<Result<Vec<_>>>()?;
        layers.push(NetworkLayer::Dense(DenseLayer::from_snapshot(
            snapshot.output,
        )?));

        Ok(Self {
            input: snapshot.input,
            layers,
            cost: snapshot.cost,
            silent: false,
            seed: snapshot.seed,
            rng: SimpleRng::new(snapshot.seed),
            state: State::Unconfigured,
        })
    }
}
