//! Predictor - failure prediction and anomaly labelling over stored models

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::dataset::FeatureVector;
use super::error::{MlError, MlResult};
use super::estimators::ANOMALY;
use super::store::ModelStore;

/// Failure prediction for one asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePrediction {
    pub will_fail_soon: bool,
    pub probability: f64,
}

/// Requested analyses in a batch call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    Maintenance,
    Anomaly,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceResult {
    pub will_fail_soon: bool,
    pub probability: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    pub anomaly_score: i8,
}

/// Per-asset batch output; absent sections were not requested
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetPrediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyResult>,
}

/// Confidence band for a failure probability.
///
/// `> 0.8` or `< 0.2` gives 0.9, `> 0.6` or `< 0.4` gives 0.7, anything
/// else 0.5. Comparisons are strict, so 0.8 maps to 0.7 and 0.6 to 0.5.
pub fn confidence(probability: f64) -> f64 {
    if probability > 0.8 || probability < 0.2 {
        0.9
    } else if probability > 0.6 || probability < 0.4 {
        0.7
    } else {
        0.5
    }
}

pub struct Predictor {
    store: Arc<ModelStore>,
}

impl Predictor {
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self { store }
    }

    pub fn predict_maintenance(&self, vector: &FeatureVector) -> MlResult<MaintenancePrediction> {
        vector.ensure_finite()?;
        let artifact = self.store.get_classifier()?;
        let (will_fail_soon, probability) = artifact.model.predict(&vector.to_array())?;

        tracing::debug!("Maintenance prediction: fail={} p={:.3}", will_fail_soon, probability);
        Ok(MaintenancePrediction {
            will_fail_soon,
            probability,
        })
    }

    /// One label per input row, same order: `-1` anomaly, `1` normal
    pub fn detect_anomalies(&self, rows: &[Vec<f64>]) -> MlResult<Vec<i8>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // Validate the whole batch before touching the model
        let vectors = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                FeatureVector::try_from(row.as_slice()).map_err(|e| match e {
                    MlError::Computation(msg) => {
                        MlError::Computation(format!("row {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<MlResult<Vec<_>>>()?;

        let artifact = self.store.get_outlier_detector()?;
        vectors
            .iter()
            .map(|v| artifact.model.predict(&v.to_array()))
            .collect()
    }

    /// Run the requested analyses for each asset, loading each model once
    pub fn batch_predict(
        &self,
        assets: &[FeatureVector],
        types: &[PredictionType],
    ) -> MlResult<Vec<AssetPrediction>> {
        for asset in assets {
            asset.ensure_finite()?;
        }

        let classifier = if types.contains(&PredictionType::Maintenance) {
            Some(self.store.get_classifier()?)
        } else {
            None
        };
        let detector = if types.contains(&PredictionType::Anomaly) {
            Some(self.store.get_outlier_detector()?)
        } else {
            None
        };

        assets
            .iter()
            .map(|asset| {
                let row = asset.to_array();
                let mut prediction = AssetPrediction::default();

                if let Some(artifact) = &classifier {
                    let (will_fail_soon, probability) = artifact.model.predict(&row)?;
                    prediction.maintenance = Some(MaintenanceResult {
                        will_fail_soon,
                        probability,
                        confidence: confidence(probability),
                    });
                }

                if let Some(artifact) = &detector {
                    let label = artifact.model.predict(&row)?;
                    prediction.anomaly = Some(AnomalyResult {
                        is_anomaly: label == ANOMALY,
                        anomaly_score: label,
                    });
                }

                Ok(prediction)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use tempfile::TempDir;

    #[test]
    fn test_empty_anomaly_batch_skips_model() {
        let dir = TempDir::new().unwrap();
        let config = ModelConfig {
            dataset_path: dir.path().join("missing.csv"),
            outlier_path: dir.path().join("anomaly_model.json"),
            ..ModelConfig::default()
        };
        let predictor = Predictor::new(Arc::new(ModelStore::new(&config)));

        assert_eq!(predictor.detect_anomalies(&[]).unwrap(), Vec::<i8>::new());
        assert!(!config.outlier_path.exists());
        assert!(predictor.detect_anomalies(&[vec![1.0, 2.0, 3.0, 4.0]]).is_err());
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(confidence(0.85), 0.9);
        assert_eq!(confidence(0.15), 0.9);
        assert_eq!(confidence(0.7), 0.7);
        assert_eq!(confidence(0.3), 0.7);
        assert_eq!(confidence(0.5), 0.5);
    }

    #[test]
    fn test_confidence_boundaries() {
        assert_eq!(confidence(0.8), 0.7);
        assert_eq!(confidence(0.2), 0.7);
        assert_eq!(confidence(0.6), 0.5);
        assert_eq!(confidence(0.4), 0.5);
        assert_eq!(confidence(1.0), 0.9);
        assert_eq!(confidence(0.0), 0.9);
    }

    #[test]
    fn test_unknown_prediction_type_parses() {
        let types: Vec<PredictionType> =
            serde_json::from_str(r#"["maintenance", "lifecycle", "anomaly"]"#).unwrap();
        assert_eq!(
            types,
            vec![PredictionType::Maintenance, PredictionType::Unknown, PredictionType::Anomaly]
        );
    }
}
