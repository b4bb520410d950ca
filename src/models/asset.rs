//! Asset feature models

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::logic::predictor::{AssetPrediction, PredictionType};
use crate::logic::FeatureVector;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssetFeatures {
    #[validate(range(min = 0.0))]
    pub usage_hours: f64,
    #[validate(range(min = 0.0))]
    pub last_maintenance_days: f64,
    #[validate(range(min = 0))]
    pub failures: i64,
    #[validate(range(min = 0.0))]
    pub age_years: f64,
    pub temperature_avg: Option<f64>,
    pub vibration_avg: Option<f64>,
    pub pressure_avg: Option<f64>,
}

impl From<AssetFeatures> for FeatureVector {
    fn from(features: AssetFeatures) -> Self {
        FeatureVector {
            temperature_avg: features.temperature_avg,
            vibration_avg: features.vibration_avg,
            pressure_avg: features.pressure_avg,
            ..FeatureVector::new(
                features.usage_hours,
                features.last_maintenance_days,
                features.failures as f64,
                features.age_years,
            )
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnomalyInsightsRequest {
    pub features_list: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct AnomalyInsightsResponse {
    pub anomalies: Vec<i8>,
}

#[derive(Debug, Serialize)]
pub struct TrainModelResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct BatchPredictionRequest {
    pub assets: Vec<AssetFeatures>,
    pub prediction_types: Vec<PredictionType>,
}

impl Validate for BatchPredictionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        for asset in &self.assets {
            asset.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct BatchPredictionResponse {
    pub total_processed: usize,
    pub results: Vec<AssetPrediction>,
    pub processing_time_ms: f64,
}
