//! Configuration module

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Model training / persistence settings
    pub models: ModelConfig,
}

/// Everything the model store and trainer need, passed in at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Labeled CSV used for training
    pub dataset_path: PathBuf,

    /// Persisted failure classifier
    pub classifier_path: PathBuf,

    /// Persisted outlier detector
    pub outlier_path: PathBuf,

    /// Seed for splits, bootstraps and tree growth
    pub random_seed: u64,

    /// Trees in the failure classifier
    pub estimator_count: usize,

    /// Trees in the outlier detector
    pub outlier_estimator_count: usize,

    /// Expected share of anomalies in the training data
    pub contamination_rate: f64,

    /// Held-out share used to report classifier accuracy
    pub test_fraction: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/sample_asset_data.csv"),
            classifier_path: PathBuf::from("models/predictive_maintenance_model.json"),
            outlier_path: PathBuf::from("models/anomaly_model.json"),
            random_seed: 42,
            estimator_count: 100,
            outlier_estimator_count: 100,
            contamination_rate: 0.2,
            test_fraction: 0.2,
        }
    }
}

impl ModelConfig {
    /// Load model settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dataset_path: env::var("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),

            classifier_path: env::var("CLASSIFIER_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.classifier_path),

            outlier_path: env::var("ANOMALY_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.outlier_path),

            random_seed: parse_var("MODEL_SEED").unwrap_or(defaults.random_seed),

            estimator_count: parse_var("CLASSIFIER_ESTIMATORS")
                .unwrap_or(defaults.estimator_count),

            outlier_estimator_count: parse_var("ANOMALY_ESTIMATORS")
                .unwrap_or(defaults.outlier_estimator_count),

            contamination_rate: parse_var("CONTAMINATION_RATE")
                .unwrap_or(defaults.contamination_rate),

            test_fraction: defaults.test_fraction,
        }
    }

    /// Reject settings the estimators cannot train with
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.estimator_count > 0,
            "CLASSIFIER_ESTIMATORS must be at least 1"
        );
        anyhow::ensure!(
            self.outlier_estimator_count > 0,
            "ANOMALY_ESTIMATORS must be at least 1"
        );
        anyhow::ensure!(
            self.contamination_rate > 0.0 && self.contamination_rate <= 0.5,
            "CONTAMINATION_RATE must be in (0, 0.5], got {}",
            self.contamination_rate
        );
        anyhow::ensure!(
            self.test_fraction > 0.0 && self.test_fraction < 1.0,
            "test fraction must be in (0, 1), got {}",
            self.test_fraction
        );
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: parse_var("PORT").unwrap_or(8000),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            models: ModelConfig::from_env(),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ModelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_untrainable_settings() {
        let high_contamination = ModelConfig {
            contamination_rate: 0.7,
            ..ModelConfig::default()
        };
        let err = high_contamination.validate().unwrap_err();
        assert!(err.to_string().contains("CONTAMINATION_RATE"));

        let no_trees = ModelConfig {
            estimator_count: 0,
            ..ModelConfig::default()
        };
        assert!(no_trees.validate().is_err());

        let no_outlier_trees = ModelConfig {
            outlier_estimator_count: 0,
            ..ModelConfig::default()
        };
        assert!(no_outlier_trees.validate().is_err());
    }
}
