//! Execution backends
//!
//! A backend owns the layer chain and drives its lifecycle. [`CpuBackend`]
//! is the reference implementation; other targets implement [`Backend`] and
//! are handed to [`Network::with_backend`](crate::network::Network::with_backend)
//! explicitly.

pub mod cpu;

pub use cpu::CpuBackend;

use crate::error::{NetworkError, Result};
use crate::matrix::Matrix;
use crate::shape::Shape;
use crate::snapshot::NetworkSnapshot;

/// One batch of samples with their targets.
///
/// `inputs` is `batch × input features`, `outputs` is `batch × output units`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    pub inputs: Matrix,
    pub outputs: Matrix,
}

impl DataSet {
    pub fn new(inputs: Matrix, outputs: Matrix) -> Self {
        Self { inputs, outputs }
    }

    pub fn batch_size(&self) -> usize {
        self.inputs.rows()
    }
}

/// Lifecycle operations of a network execution target.
///
/// Persistence is optional: `snapshot` and `from_snapshot` fail with
/// `UnimplementedOperation` unless a backend overrides them.
pub trait Backend {
    /// Resolve every layer's shape for `input_shape` and allocate buffers
    /// for `batch_size` samples.
    fn initialize(&mut self, input_shape: Shape, batch_size: usize) -> Result<()>;

    /// Run `epochs` passes over `datasets`, updating parameters with plain
    /// SGD at `rate`. `batches` is used only when the batch size cannot be
    /// read from the first dataset.
    fn train(&mut self, datasets: &[DataSet], epochs: usize, batches: usize, rate: f32)
        -> Result<()>;

    /// Forward pass only; one output row per input row.
    fn predict(&mut self, input: &Matrix) -> Result<Matrix>;

    /// Mean cost over `datasets`, forward pass only.
    fn evaluate(&mut self, datasets: &[DataSet]) -> Result<f32>;

    fn snapshot(&self) -> Result<NetworkSnapshot> {
        Err(NetworkError::UnimplementedOperation {
            operation: "snapshot",
        })
    }

    fn from_snapshot(_snapshot: NetworkSnapshot) -> Result<Self>
    where
        Self: Sized,
    {
        Err(NetworkError::UnimplementedOperation {
            operation: "from_snapshot",
        })
    }
}
