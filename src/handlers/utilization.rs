//! Utilization optimization handler

use axum::Json;

use crate::AppResult;
use crate::logic::optimize_utilization;
use crate::middleware::validate::ValidatedJson;
use crate::models::{UtilizationData, UtilizationResponse};

pub async fn optimize(
    ValidatedJson(req): ValidatedJson<UtilizationData>,
) -> AppResult<Json<UtilizationResponse>> {
    let optimization = optimize_utilization(&req.to_record());

    tracing::debug!(
        "Asset {} utilization {:.2}, {} recommendations",
        req.asset_id,
        optimization.current_utilization,
        optimization.recommendations.len()
    );

    Ok(Json(UtilizationResponse {
        asset_id: req.asset_id,
        optimization,
    }))
}
