//! Model information handler

use axum::{extract::State, Json};
use serde::Serialize;
use tokio::task;

use crate::{AppState, AppResult};
use crate::logic::store::{ArtifactStatus, CLASSIFIER_ALGORITHM, OUTLIER_ALGORITHM};
use crate::logic::{FEATURE_COUNT, FEATURE_NAMES};

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub models: ModelsInfo,
    pub service_version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelsInfo {
    pub predictive_maintenance: ClassifierInfo,
    pub anomaly_detection: DetectorInfo,
}

#[derive(Debug, Serialize)]
pub struct ClassifierInfo {
    pub algorithm: &'static str,
    pub features: [&'static str; FEATURE_COUNT],
    pub estimators: usize,
    pub artifact: ArtifactStatus,
}

#[derive(Debug, Serialize)]
pub struct DetectorInfo {
    pub algorithm: &'static str,
    pub contamination_rate: f64,
    pub estimators: usize,
    pub artifact: ArtifactStatus,
}

/// Describe both models and what is currently persisted
pub async fn info(State(state): State<AppState>) -> AppResult<Json<ModelInfoResponse>> {
    let store = state.store.clone();
    let (classifier, detector) = task::spawn_blocking(move || {
        Ok::<_, crate::logic::MlError>((store.classifier_status()?, store.outlier_status()?))
    })
    .await??;

    let models = &state.config.models;
    Ok(Json(ModelInfoResponse {
        models: ModelsInfo {
            predictive_maintenance: ClassifierInfo {
                algorithm: CLASSIFIER_ALGORITHM,
                features: FEATURE_NAMES,
                estimators: models.estimator_count,
                artifact: classifier,
            },
            anomaly_detection: DetectorInfo {
                algorithm: OUTLIER_ALGORITHM,
                contamination_rate: models.contamination_rate,
                estimators: models.outlier_estimator_count,
                artifact: detector,
            },
        },
        service_version: env!("CARGO_PKG_VERSION"),
    }))
}
