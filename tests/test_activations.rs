// Tests for activation functions and their derivatives.
// Derivatives are checked against central finite differences.

use approx::assert_relative_eq;
use neural_engine::utils::activations::{sigmoid, sigmoid_prime};
use neural_engine::utils::Activation;

const ALL: [Activation; 6] = [
    Activation::Linear,
    Activation::Sigmoid,
    Activation::Tanh,
    Activation::Relu,
    Activation::LeakyRelu,
    Activation::Elu,
];

fn numerical_derivative(activation: Activation, z: f32) -> f32 {
    let h = 1e-3f32;
    (activation.activate(z + h) - activation.activate(z - h)) / (2.0 * h)
}

// ============================================================================
// Values
// ============================================================================

mod value_tests {
    use super::*;

    #[test]
    fn test_sigmoid_known_values() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert_relative_eq!(sigmoid(2.0), 0.880_797, epsilon = 1e-6);
        assert_relative_eq!(sigmoid(-2.0), 0.119_203, epsilon = 1e-6);
    }

    #[test]
    fn test_sigmoid_saturates_without_nan() {
        assert!(sigmoid(100.0) <= 1.0);
        assert!(sigmoid(-100.0) >= 0.0);
        assert!(!sigmoid(-1000.0).is_nan());
    }

    #[test]
    fn test_piecewise_activations() {
        assert_eq!(Activation::Relu.activate(-3.0), 0.0);
        assert_eq!(Activation::Relu.activate(3.0), 3.0);
        assert_relative_eq!(Activation::LeakyRelu.activate(-2.0), -0.02);
        assert_relative_eq!(Activation::Elu.activate(-1.0), (-1.0f32).exp() - 1.0);
        assert_eq!(Activation::Linear.activate(-7.5), -7.5);
    }

    #[test]
    fn test_all_activations_fix_zero() {
        for activation in ALL {
            if activation == Activation::Sigmoid {
                continue;
            }
            assert_eq!(activation.activate(0.0), 0.0, "{} at 0", activation);
        }
    }
}

// ============================================================================
// Derivatives
// ============================================================================

mod derivative_tests {
    use super::*;

    #[test]
    fn test_sigmoid_prime_takes_pre_activation() {
        let z = 0.7;
        let s = sigmoid(z);
        assert_relative_eq!(sigmoid_prime(z), s * (1.0 - s));
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        // Points away from the kinks of relu-like functions
        for activation in ALL {
            for &z in &[-1.7f32, -0.4, 0.3, 1.2] {
                let numerical = numerical_derivative(activation, z);
                let analytical = activation.prime(z);
                assert_relative_eq!(numerical, analytical, epsilon = 1e-3, max_relative = 0.01);
            }
        }
    }
}

// ============================================================================
// Names
// ============================================================================

mod name_tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for activation in ALL {
            assert_eq!(activation.name().parse::<Activation>().unwrap(), activation);
        }
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&Activation::LeakyRelu).unwrap();
        assert_eq!(json, "\"leakyrelu\"");
        let parsed: Activation = serde_json::from_str("\"Tanh\"").unwrap();
        assert_eq!(parsed, Activation::Tanh);
        assert!(serde_json::from_str::<Activation>("\"swish\"").is_err());
    }

    #[test]
    fn test_default_is_sigmoid() {
        assert_eq!(Activation::default(), Activation::Sigmoid);
    }
}
