//! Tests for training configuration parsing
//!
//! This file tests the config module including:
//! - Loading valid JSON config files
//! - Handling missing optional fields with defaults
//! - Rejecting out-of-range values
//! - Handling invalid JSON and missing files

use neural_engine::config::{load_config, validate_config, TrainingConfig};
use neural_engine::NetworkError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

// ============================================================================
// Valid Config Loading Tests
// ============================================================================

mod valid_config_tests {
    use super::*;

    #[test]
    fn test_load_shipped_xor_config() {
        let config = load_config("config/xor_training.json").expect("Failed to load xor config");

        assert_eq!(config.epochs, 5000);
        assert_eq!(config.batches, 4);
        assert!((config.learning_rate - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_load_full_config() {
        let temp_file =
            write_temp_config(r#"{ "epochs": 200, "batches": 32, "learning_rate": 0.01 }"#);
        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.epochs, 200);
        assert_eq!(config.batches, 32);
        assert!((config.learning_rate - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let temp_file = write_temp_config(r#"{ "epochs": 10 }"#);
        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.epochs, 10);
        assert_eq!(config.batches, 1);
        assert!((config.learning_rate - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_empty_object_is_default() {
        let temp_file = write_temp_config("{}");
        assert_eq!(load_config(temp_file.path()).unwrap(), TrainingConfig::default());
    }
}

// ============================================================================
// Validation Tests
// ============================================================================

mod validation_tests {
    use super::*;

    #[test]
    fn test_zero_epochs() {
        let temp_file = write_temp_config(r#"{ "epochs": 0 }"#);
        let result = load_config(temp_file.path());
        match result {
            Err(NetworkError::InvalidConfig { message }) => assert!(message.contains("epochs")),
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_batches() {
        let config = TrainingConfig {
            batches: 0,
            ..TrainingConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_non_positive_learning_rate() {
        for rate in [0.0, -0.5, f32::NAN, f32::INFINITY] {
            let config = TrainingConfig {
                learning_rate: rate,
                ..TrainingConfig::default()
            };
            assert!(validate_config(&config).is_err(), "rate {} accepted", rate);
        }
    }

    #[test]
    fn test_negative_epochs_do_not_parse() {
        let temp_file = write_temp_config(r#"{ "epochs": -5 }"#);
        assert!(matches!(
            load_config(temp_file.path()),
            Err(NetworkError::Serialization(_))
        ));
    }
}

// ============================================================================
// Error Handling Tests
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_invalid_json() {
        let temp_file = write_temp_config("{ epochs: 10 ");
        assert!(matches!(
            load_config(temp_file.path()),
            Err(NetworkError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config("config/nonexistent.json"),
            Err(NetworkError::Io(_))
        ));
    }
}
