//! Anomaly detection handlers

use axum::{extract::State, Json};
use tokio::task;

use crate::{AppState, AppResult};
use crate::middleware::validate::ValidatedJson;
use crate::models::{AnomalyInsightsRequest, AnomalyInsightsResponse, TrainModelResponse};

/// Label each feature row: -1 anomaly, 1 normal
pub async fn insights(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AnomalyInsightsRequest>,
) -> AppResult<Json<AnomalyInsightsResponse>> {
    let predictor = state.predictor.clone();
    let anomalies =
        task::spawn_blocking(move || predictor.detect_anomalies(&req.features_list)).await??;

    Ok(Json(AnomalyInsightsResponse { anomalies }))
}

/// Retrain the outlier detector from the dataset
pub async fn train(State(state): State<AppState>) -> AppResult<Json<TrainModelResponse>> {
    let store = state.store.clone();
    task::spawn_blocking(move || store.retrain_outlier_detector()).await??;

    Ok(Json(TrainModelResponse {
        message: "Anomaly model trained".to_string(),
        accuracy: None,
    }))
}
