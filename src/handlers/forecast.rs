//! Lifecycle forecast handler

use axum::Json;

use crate::AppResult;
use crate::logic::generate_lifecycle_forecast;
use crate::middleware::validate::ValidatedJson;
use crate::models::{ForecastRequest, ForecastResponse};

pub async fn lifecycle(
    ValidatedJson(req): ValidatedJson<ForecastRequest>,
) -> AppResult<Json<ForecastResponse>> {
    let forecast = generate_lifecycle_forecast(&req.historical_data, req.forecast_months);

    Ok(Json(ForecastResponse {
        asset_id: req.asset_id,
        forecast_type: "lifecycle",
        time_horizon_months: req.forecast_months,
        forecast,
    }))
}
