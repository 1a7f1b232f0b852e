// Tests for numerical gradient checking using finite differences.
// Analytical gradients from a two-layer dense chain (sigmoid activations,
// cross-entropy cost) are compared with central differences of the loss.

use approx::assert_relative_eq;
use neural_engine::layers::{DenseLayer, Layer};
use neural_engine::optimizers::Optimizer;
use neural_engine::utils::{Activation, SimpleRng};
use neural_engine::{CostFunction, Matrix, Shape};

// Captures gradients in call order and leaves parameters untouched.
#[derive(Default)]
struct RecordingOptimizer {
    gradients: Vec<Vec<f32>>,
}

impl Optimizer for RecordingOptimizer {
    fn update(&mut self, _parameters: &mut [f32], gradients: &[f32]) {
        self.gradients.push(gradients.to_vec());
    }

    fn reset(&mut self) {
        self.gradients.clear();
    }

    fn learning_rate(&self) -> f32 {
        0.0
    }

    fn set_learning_rate(&mut self, _lr: f32) {}
}

#[derive(Clone)]
struct Parameters {
    hidden_weights: Matrix,
    hidden_biases: Matrix,
    output_weights: Matrix,
    output_biases: Matrix,
}

const INPUTS: usize = 3;
const HIDDEN: usize = 4;
const OUTPUTS: usize = 2;

fn random_matrix(rng: &mut SimpleRng, rows: usize, cols: usize, scale: f32) -> Matrix {
    let data = (0..rows * cols)
        .map(|_| rng.gen_range_f32(-scale, scale))
        .collect();
    Matrix::create(data, rows, cols).unwrap()
}

fn parameters() -> Parameters {
    let mut rng = SimpleRng::new(2024);
    Parameters {
        hidden_weights: random_matrix(&mut rng, INPUTS, HIDDEN, 1.0),
        hidden_biases: random_matrix(&mut rng, 1, HIDDEN, 0.5),
        output_weights: random_matrix(&mut rng, HIDDEN, OUTPUTS, 1.0),
        output_biases: random_matrix(&mut rng, 1, OUTPUTS, 0.5),
    }
}

fn batch() -> (Matrix, Matrix) {
    let inputs = Matrix::from_rows(&[
        vec![0.5, -1.0, 0.25],
        vec![-0.3, 0.8, 1.0],
        vec![1.2, 0.1, -0.7],
    ])
    .unwrap();
    let targets = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
    (inputs, targets)
}

fn build(params: &Parameters, batch_size: usize) -> (DenseLayer, DenseLayer) {
    let mut rng = SimpleRng::new(0);
    let mut hidden = DenseLayer::from_parameters(
        params.hidden_weights.clone(),
        params.hidden_biases.clone(),
        Activation::Sigmoid,
    )
    .unwrap();
    let shape = hidden
        .initialize(Shape::Flat(INPUTS), batch_size, &mut rng)
        .unwrap();
    let mut output = DenseLayer::from_parameters(
        params.output_weights.clone(),
        params.output_biases.clone(),
        Activation::Sigmoid,
    )
    .unwrap();
    output.initialize(shape, batch_size, &mut rng).unwrap();
    (hidden, output)
}

// Summed (not averaged) cost, matching the batch-summed gradients.
fn total_loss(params: &Parameters, inputs: &Matrix, targets: &Matrix) -> f32 {
    let (mut hidden, mut output) = build(params, inputs.rows());
    let activations = hidden.feed_forward(inputs.clone()).unwrap();
    let predicted = output.feed_forward(activations).unwrap();
    CostFunction::CrossEntropy.loss(&predicted, targets).unwrap() * inputs.rows() as f32
}

// Order: output weights, output biases, hidden weights, hidden biases.
fn analytical_gradients(params: &Parameters, inputs: &Matrix, targets: &Matrix) -> Vec<Vec<f32>> {
    let (mut hidden, mut output) = build(params, inputs.rows());
    let activations = hidden.feed_forward(inputs.clone()).unwrap();
    let predicted = output.feed_forward(activations).unwrap();
    let error = CostFunction::CrossEntropy.error(&predicted, targets).unwrap();

    let mut recorder = RecordingOptimizer::default();
    let hidden_error = output.back_propagate(&error, &mut recorder).unwrap();
    hidden.back_propagate(&hidden_error, &mut recorder).unwrap();
    recorder.gradients
}

fn output_weights(p: &mut Parameters) -> &mut Matrix {
    &mut p.output_weights
}

fn output_biases(p: &mut Parameters) -> &mut Matrix {
    &mut p.output_biases
}

fn hidden_weights(p: &mut Parameters) -> &mut Matrix {
    &mut p.hidden_weights
}

fn hidden_biases(p: &mut Parameters) -> &mut Matrix {
    &mut p.hidden_biases
}

fn numerical_gradient(
    params: &Parameters,
    inputs: &Matrix,
    targets: &Matrix,
    select: fn(&mut Parameters) -> &mut Matrix,
    index: usize,
) -> f32 {
    let h = 1e-2f32;
    let mut plus = params.clone();
    select(&mut plus).data_mut()[index] += h;
    let mut minus = params.clone();
    select(&mut minus).data_mut()[index] -= h;
    (total_loss(&plus, inputs, targets) - total_loss(&minus, inputs, targets)) / (2.0 * h)
}

fn check(select: fn(&mut Parameters) -> &mut Matrix, slot: usize) {
    let params = parameters();
    let (inputs, targets) = batch();
    let analytical = analytical_gradients(&params, &inputs, &targets);
    let mut probe = params.clone();
    let len = select(&mut probe).len();

    for index in 0..len {
        let numerical = numerical_gradient(&params, &inputs, &targets, select, index);
        assert_relative_eq!(
            numerical,
            analytical[slot][index],
            epsilon = 2e-3,
            max_relative = 2e-2
        );
    }
}

// ============================================================================
// Dense Chain Gradients
// ============================================================================

mod dense_gradient_tests {
    use super::*;

    #[test]
    fn test_output_weight_gradients() {
        check(output_weights, 0);
    }

    #[test]
    fn test_output_bias_gradients() {
        check(output_biases, 1);
    }

    #[test]
    fn test_hidden_weight_gradients() {
        check(hidden_weights, 2);
    }

    #[test]
    fn test_hidden_bias_gradients() {
        check(hidden_biases, 3);
    }

    #[test]
    fn test_gradients_are_batch_sums() {
        let params = parameters();
        let (inputs, targets) = batch();
        let full = analytical_gradients(&params, &inputs, &targets);

        let mut summed = vec![0.0f32; full[1].len()];
        for row in 0..inputs.rows() {
            let x = Matrix::create(inputs.row(row).to_vec(), 1, INPUTS).unwrap();
            let t = Matrix::create(targets.row(row).to_vec(), 1, OUTPUTS).unwrap();
            for (s, g) in summed.iter_mut().zip(&analytical_gradients(&params, &x, &t)[1]) {
                *s += g;
            }
        }
        for (a, b) in full[1].iter().zip(&summed) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }
    }
}

// ============================================================================
// Cost Derivatives
// ============================================================================

mod cost_gradient_tests {
    use super::*;

    #[test]
    fn test_cross_entropy_prime_times_sigmoid_prime_is_residual() {
        // With a sigmoid output, dL/dz reduces to p - t
        let cost = CostFunction::CrossEntropy;
        for &(p, t) in &[(0.2f32, 1.0f32), (0.7, 0.0), (0.5, 1.0)] {
            let dz = cost.prime(p, t) * p * (1.0 - p);
            assert_relative_eq!(dz, p - t, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_saturated_sigmoid_output_passes_no_gradient() {
        let cost = CostFunction::CrossEntropy;
        let p = Activation::Sigmoid.activate(40.0);
        assert_eq!(p, 1.0);

        // Confidently wrong: bounded cost, zero delta at the output unit
        assert!(cost.cost(p, 0.0).is_finite());
        let dz = cost.prime(p, 0.0) * Activation::Sigmoid.prime(40.0);
        assert_eq!(dz, 0.0);
    }

    #[test]
    fn test_hinge_gradient_matches_finite_difference() {
        let cost = CostFunction::Hinge;
        let h = 1e-3f32;
        for &(p, t) in &[(0.3f32, 1.0f32), (-0.4, -1.0), (0.2, -1.0)] {
            let numerical = (cost.cost(p + h, t) - cost.cost(p - h, t)) / (2.0 * h);
            assert_relative_eq!(numerical, cost.prime(p, t), epsilon = 1e-3);
        }
    }
}
