// Tests for layer and network snapshots: JSON layout, exact reconstruction,
// and rejection of unknown layer kinds.

use approx::assert_relative_eq;
use neural_engine::architecture::{LayerConfig, NetworkConfig};
use neural_engine::layers::{
    ActivationConfig, ConvConfig, DenseConfig, FlattenConfig, Layer, LayerSnapshot, NetworkLayer,
    PoolConfig,
};
use neural_engine::utils::{Activation, SimpleRng};
use neural_engine::{CostFunction, CpuBackend, DataSet, Matrix, Network, NetworkError, Shape};

fn random_matrix(rng: &mut SimpleRng, rows: usize, cols: usize) -> Matrix {
    let data = (0..rows * cols).map(|_| rng.gen_range_f32(-1.0, 1.0)).collect();
    Matrix::create(data, rows, cols).unwrap()
}

fn assert_same(a: &Matrix, b: &Matrix) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.data().iter().zip(b.data()) {
        assert_relative_eq!(*x, *y, epsilon = 1e-6);
    }
}

// Initialize, run forward, snapshot through JSON text, rebuild, rerun.
fn check_layer_round_trip(config: LayerConfig, input_shape: Shape) {
    let batch = 2;
    let mut rng = SimpleRng::new(17);
    let mut layer = NetworkLayer::from_config(config);
    layer.initialize(input_shape, batch, &mut rng).unwrap();
    let input = random_matrix(&mut rng, batch, input_shape.size());
    let expected = layer.feed_forward(input.clone()).unwrap();

    let json = serde_json::to_string(&layer.snapshot()).unwrap();
    let snapshot: LayerSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot.kind(), layer.kind());

    let mut restored = NetworkLayer::from_snapshot(snapshot).unwrap();
    restored.initialize(input_shape, batch, &mut rng).unwrap();
    assert_eq!(restored.parameter_count(), layer.parameter_count());
    let actual = restored.feed_forward(input).unwrap();
    assert_same(&expected, &actual);
}

fn xor_datasets() -> Vec<DataSet> {
    let inputs = Matrix::from_rows(&[
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 1.0],
    ])
    .unwrap();
    let outputs = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![1.0], vec![0.0]]).unwrap();
    vec![DataSet::new(inputs, outputs)]
}

fn trained_network() -> Network {
    let config = NetworkConfig::new(vec![
        LayerConfig::Dense(DenseConfig::new(3)),
        LayerConfig::Dense(DenseConfig::new(1)),
    ])
    .silent(true)
    .with_seed(7);
    let mut network = Network::new(config).unwrap();
    network.train(&xor_datasets(), 200, 4, 0.5).unwrap();
    network
}

// ============================================================================
// Layer Round Trips
// ============================================================================

mod layer_round_trip_tests {
    use super::*;

    #[test]
    fn test_dense_round_trip() {
        check_layer_round_trip(
            LayerConfig::Dense(DenseConfig::new(5).with_activation(Activation::Tanh)),
            Shape::Flat(6),
        );
    }

    #[test]
    fn test_conv_round_trip() {
        check_layer_round_trip(
            LayerConfig::Conv(ConvConfig::new(3, 3).with_stride(2).with_padding(1)),
            Shape::image(2, 6, 6),
        );
        check_layer_round_trip(
            LayerConfig::Conv(ConvConfig::new(2, 2).unbiased()),
            Shape::image(1, 4, 4),
        );
    }

    #[test]
    fn test_pool_round_trip() {
        check_layer_round_trip(LayerConfig::Pool(PoolConfig::max(2)), Shape::image(2, 4, 4));
        check_layer_round_trip(
            LayerConfig::Pool(PoolConfig::avg(3).with_stride(1)),
            Shape::image(1, 5, 5),
        );
    }

    #[test]
    fn test_activation_round_trip() {
        check_layer_round_trip(
            LayerConfig::Activation(ActivationConfig {
                activation: Activation::Elu,
            }),
            Shape::image(2, 3, 3),
        );
    }

    #[test]
    fn test_flatten_round_trip() {
        check_layer_round_trip(
            LayerConfig::Flatten(FlattenConfig::default()),
            Shape::image(2, 3, 3),
        );
    }

    #[test]
    fn test_dense_snapshot_layout() {
        let mut rng = SimpleRng::new(1);
        let mut layer = NetworkLayer::from_config(LayerConfig::Dense(DenseConfig::new(2)));
        layer.initialize(Shape::Flat(3), 1, &mut rng).unwrap();
        let value = serde_json::to_value(layer.snapshot()).unwrap();

        assert_eq!(value["type"], "dense");
        assert_eq!(value["size"], 2);
        assert_eq!(value["activation"], "sigmoid");
        assert_eq!(value["input_shape"], serde_json::json!([3]));
        assert_eq!(value["weights"]["rows"], 3);
        assert_eq!(value["weights"]["cols"], 2);
        assert_eq!(value["biases"]["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_layer_snapshot_tag() {
        let result = serde_json::from_str::<LayerSnapshot>(r#"{ "type": "lstm" }"#);
        assert!(result.is_err());
    }
}

// ============================================================================
// Network Round Trips
// ============================================================================

mod network_round_trip_tests {
    use super::*;

    #[test]
    fn test_predict_identical_after_from_json() {
        let mut network = trained_network();
        let probe = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.3, 0.9]]).unwrap();
        let before = network.predict(&probe).unwrap();

        let json = network.to_json().unwrap();
        let mut restored: Network = Network::from_json(&json).unwrap();
        let after = restored.predict(&probe).unwrap();

        assert_same(&before, &after);
    }

    #[test]
    fn test_network_snapshot_layout() {
        let network = trained_network();
        let value: serde_json::Value = serde_json::from_str(&network.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "NeuralNetwork");
        assert_eq!(value["costFn"], "crossentropy");
        assert_eq!(value["input"], serde_json::json!([2]));
        assert_eq!(value["sizes"], serde_json::json!([[3], [1]]));
        assert_eq!(value["layers"].as_array().unwrap().len(), 1);
        assert_eq!(value["layers"][0]["size"], 3);
        assert_eq!(value["output"]["type"], "dense");
        assert_eq!(value["output"]["size"], 1);
    }

    #[test]
    fn test_restored_network_keeps_cost_and_weights() {
        let network = trained_network();
        let restored: Network = Network::from_snapshot(network.to_snapshot().unwrap()).unwrap();

        assert_eq!(restored.backend().cost(), CostFunction::CrossEntropy);
        assert_eq!(restored.backend().weights(), network.backend().weights());
        assert_eq!(restored.backend().biases(), network.backend().biases());
    }

    #[test]
    fn test_restored_cnn_predicts_identically() {
        let config = NetworkConfig::new(vec![
            LayerConfig::Conv(ConvConfig::new(2, 3).with_padding(1)),
            LayerConfig::Activation(ActivationConfig {
                activation: Activation::Relu,
            }),
            LayerConfig::Pool(PoolConfig::max(2)),
            LayerConfig::Flatten(FlattenConfig::default()),
            LayerConfig::Dense(DenseConfig::new(2)),
        ])
        .with_input(Shape::image(1, 4, 4))
        .silent(true)
        .with_seed(3);
        let mut network = Network::new(config).unwrap();

        let mut rng = SimpleRng::new(8);
        let probe = random_matrix(&mut rng, 1, 16);
        let before = network.predict(&probe).unwrap();
        let sizes = network.to_snapshot().unwrap().sizes;
        assert_eq!(
            sizes,
            vec![
                Shape::image(2, 4, 4),
                Shape::image(2, 4, 4),
                Shape::image(2, 2, 2),
                Shape::Flat(8),
                Shape::Flat(2),
            ]
        );

        let mut restored: Network = Network::from_json(&network.to_json().unwrap()).unwrap();
        // Not run yet: shapes come from the stored input shapes
        let again: Network = Network::from_json(&restored.to_json().unwrap()).unwrap();
        assert_eq!(again.to_snapshot().unwrap().sizes, sizes);

        let after = restored.predict(&probe).unwrap();
        assert_same(&before, &after);
    }

    #[test]
    fn test_uninitialized_snapshot_keeps_seed() {
        let config = NetworkConfig::new(vec![
            LayerConfig::Dense(DenseConfig::new(4)),
            LayerConfig::Dense(DenseConfig::new(1)),
        ])
        .silent(true)
        .with_seed(9);
        let mut network = Network::new(config).unwrap();
        let snapshot = network.to_snapshot().unwrap();
        assert_eq!(snapshot.seed, 9);
        assert!(snapshot.sizes.is_empty());

        let mut restored: Network = Network::from_json(&snapshot.to_json().unwrap()).unwrap();
        network.initialize(Shape::Flat(3), 1).unwrap();
        restored.initialize(Shape::Flat(3), 1).unwrap();
        assert_eq!(restored.backend().weights(), network.backend().weights());
    }

    #[test]
    fn test_from_json_rejects_unknown_kind() {
        let json = r#"{
            "type": "NeuralNetwork",
            "costFn": "crossentropy",
            "input": [2],
            "sizes": [[3], [1]],
            "layers": [ { "type": "recurrent", "size": 3 } ],
            "output": { "type": "dense", "size": 1, "activation": "sigmoid" }
        }"#;
        match Network::<CpuBackend>::from_json(json) {
            Err(NetworkError::UnsupportedLayerKind { kind }) => assert_eq!(kind, "recurrent"),
            other => panic!("expected unsupported kind, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_from_json_rejects_non_dense_output() {
        let json = r#"{
            "type": "NeuralNetwork",
            "costFn": "crossentropy",
            "layers": [],
            "output": { "type": "flatten" }
        }"#;
        assert!(Network::<CpuBackend>::from_json(json).is_err());
    }
}
