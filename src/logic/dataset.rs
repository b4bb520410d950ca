//! Dataset Module - labeled asset history used for training
//!
//! The training source is a CSV file with a header row:
//! `usage_hours,last_maintenance_days,failures,age_years,will_fail_soon`.

use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{MlError, MlResult};

/// Number of features consumed by the models
pub const FEATURE_COUNT: usize = 4;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "usage_hours",
    "last_maintenance_days",
    "failures",
    "age_years",
];

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Operating condition of one asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub usage_hours: f64,
    pub last_maintenance_days: f64,
    pub failures: f64,
    pub age_years: f64,

    // Sensor readings, accepted but not used by the trained models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_avg: Option<f64>,
}

impl FeatureVector {
    pub fn new(
        usage_hours: f64,
        last_maintenance_days: f64,
        failures: f64,
        age_years: f64,
    ) -> Self {
        Self {
            usage_hours,
            last_maintenance_days,
            failures,
            age_years,
            temperature_avg: None,
            vibration_avg: None,
            pressure_avg: None,
        }
    }

    /// Model input, in training column order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.usage_hours,
            self.last_maintenance_days,
            self.failures,
            self.age_years,
        ]
    }

    /// Reject NaN / infinite inputs before they reach a model
    pub fn ensure_finite(&self) -> MlResult<()> {
        match self.to_array().iter().position(|v| !v.is_finite()) {
            Some(idx) => Err(MlError::Computation(format!(
                "feature '{}' must be a finite number",
                FEATURE_NAMES[idx]
            ))),
            None => Ok(()),
        }
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = MlError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        match values {
            [usage, last_maintenance, failures, age] => {
                let vector = Self::new(*usage, *last_maintenance, *failures, *age);
                vector.ensure_finite()?;
                Ok(vector)
            }
            _ => Err(MlError::Computation(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                values.len()
            ))),
        }
    }
}

// ============================================================================
// LABELED DATASET
// ============================================================================

#[derive(Debug, Deserialize)]
struct DatasetRow {
    usage_hours: f64,
    last_maintenance_days: f64,
    failures: f64,
    age_years: f64,
    #[serde(deserialize_with = "deserialize_label")]
    will_fail_soon: bool,
}

fn deserialize_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Ok(true),
        "0" | "0.0" | "false" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid label '{}'", other))),
    }
}

/// Feature matrix (one row per asset) with its failure labels
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    features: Array2<f64>,
    labels: Vec<bool>,
}

impl LabeledDataset {
    /// Load the dataset from a CSV file
    pub fn load(path: &Path) -> MlResult<Self> {
        if !path.exists() {
            return Err(MlError::DataUnavailable(format!(
                "dataset not found: {}",
                path.display()
            )));
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: DatasetRow = result?;
            rows.push((
                [row.usage_hours, row.last_maintenance_days, row.failures, row.age_years],
                row.will_fail_soon,
            ));
        }

        if rows.is_empty() {
            return Err(MlError::DataUnavailable(format!(
                "dataset is empty: {}",
                path.display()
            )));
        }

        tracing::debug!("Loaded {} dataset rows from {}", rows.len(), path.display());
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<([f64; FEATURE_COUNT], bool)>) -> MlResult<Self> {
        let mut flat = Vec::with_capacity(rows.len() * FEATURE_COUNT);
        let mut labels = Vec::with_capacity(rows.len());
        for (features, label) in rows {
            if features.iter().any(|v| !v.is_finite()) {
                return Err(MlError::DataUnavailable(
                    "dataset contains non-finite values".to_string(),
                ));
            }
            flat.extend_from_slice(&features);
            labels.push(label);
        }

        let features = Array2::from_shape_vec((labels.len(), FEATURE_COUNT), flat)
            .map_err(|e| MlError::DataUnavailable(format!("dataset shape: {}", e)))?;

        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.features.row(index)
    }

    /// Subset of the dataset, in the given row order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}
