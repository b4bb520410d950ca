//! Lifecycle forecast models

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::logic::{LifecycleForecast, LifecycleRecord};

fn default_forecast_months() -> usize {
    12
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForecastRequest {
    #[validate(length(min = 1))]
    pub asset_id: String,
    pub historical_data: Vec<LifecycleRecord>,
    #[serde(default = "default_forecast_months")]
    #[validate(range(min = 1, max = 120))]
    pub forecast_months: usize,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub asset_id: String,
    pub forecast_type: &'static str,
    pub time_horizon_months: usize,
    #[serde(flatten)]
    pub forecast: LifecycleForecast,
}
