//! Predictive maintenance handlers

use axum::{extract::State, Json};
use tokio::task;

use crate::{AppState, AppResult};
use crate::logic::{FeatureVector, MaintenancePrediction};
use crate::middleware::validate::ValidatedJson;
use crate::models::{AssetFeatures, TrainModelResponse};

/// Predict whether an asset will fail soon
pub async fn predict(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AssetFeatures>,
) -> AppResult<Json<MaintenancePrediction>> {
    let vector = FeatureVector::from(req);
    let predictor = state.predictor.clone();

    // May train on first use
    let prediction = task::spawn_blocking(move || predictor.predict_maintenance(&vector)).await??;
    Ok(Json(prediction))
}

/// Retrain the failure classifier from the dataset
pub async fn train(State(state): State<AppState>) -> AppResult<Json<TrainModelResponse>> {
    let store = state.store.clone();
    let artifact = task::spawn_blocking(move || store.retrain_classifier()).await??;

    Ok(Json(TrainModelResponse {
        message: "Model trained".to_string(),
        accuracy: artifact.accuracy,
    }))
}
