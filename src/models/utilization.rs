//! Utilization optimization models

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::logic::{OptimizationResult, UtilizationRecord};

#[allow(clippy::ptr_arg)]
fn validate_samples(samples: &Vec<f64>) -> Result<(), ValidationError> {
    if samples.iter().all(|s| (0.0..=1.0).contains(s)) {
        Ok(())
    } else {
        Err(ValidationError::new("utilization samples must be within [0, 1]"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UtilizationData {
    #[validate(length(min = 1))]
    pub asset_id: String,
    #[validate(custom(function = "validate_samples"))]
    pub historical_utilization: Vec<f64>,
    #[validate(range(min = 0))]
    pub location_changes: i64,
    #[validate(range(min = 0))]
    pub maintenance_events: i64,
    #[validate(range(min = 0.0))]
    pub operational_hours: f64,
}

impl UtilizationData {
    pub fn to_record(&self) -> UtilizationRecord {
        UtilizationRecord {
            historical_utilization: self.historical_utilization.clone(),
            location_changes: self.location_changes,
            maintenance_events: self.maintenance_events,
            operational_hours: self.operational_hours,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UtilizationResponse {
    pub asset_id: String,
    #[serde(flatten)]
    pub optimization: OptimizationResult,
}
