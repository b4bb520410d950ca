//! Batch prediction handler

use std::time::Instant;

use axum::{extract::State, Json};
use tokio::task;

use crate::{AppState, AppResult};
use crate::logic::FeatureVector;
use crate::middleware::validate::ValidatedJson;
use crate::models::{BatchPredictionRequest, BatchPredictionResponse};

/// Run maintenance and/or anomaly predictions over many assets
pub async fn predictions(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<BatchPredictionRequest>,
) -> AppResult<Json<BatchPredictionResponse>> {
    let started = Instant::now();
    let assets: Vec<FeatureVector> = req.assets.into_iter().map(FeatureVector::from).collect();
    let types = req.prediction_types;
    let predictor = state.predictor.clone();

    let results = task::spawn_blocking(move || predictor.batch_predict(&assets, &types)).await??;

    Ok(Json(BatchPredictionResponse {
        total_processed: results.len(),
        results,
        processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
    }))
}
