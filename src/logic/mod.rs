//! Logic Module - prediction, training, optimization and forecasting
//!
//! # Architecture
//! - `dataset.rs`: Feature vectors and the labeled training CSV
//! - `estimators/`: Random forest classifier, isolation forest detector
//! - `trainer.rs`: Seeded split + fitting
//! - `store.rs`: Persisted artifacts with train-on-first-read
//! - `predictor.rs`: Failure / anomaly predictions over stored models
//! - `optimizer.rs`: Rule-based utilization recommendations
//! - `forecast.rs`: Utilization trend and maintenance cost forecast
//!
//! Only the predictor and trainer touch the model store; the optimizer and
//! forecaster are pure functions of their input.

pub mod dataset;
pub mod error;
pub mod estimators;
pub mod forecast;
pub mod optimizer;
pub mod predictor;
pub mod store;
pub mod trainer;

pub use dataset::{FeatureVector, LabeledDataset, FEATURE_COUNT, FEATURE_NAMES};
pub use error::{MlError, MlResult};
pub use forecast::{
    forecast_utilization, generate_lifecycle_forecast, LifecycleForecast, LifecycleRecord,
};
pub use optimizer::{optimize_utilization, OptimizationResult, Recommendation, UtilizationRecord};
pub use predictor::{confidence, MaintenancePrediction, PredictionType, Predictor};
pub use store::{ArtifactStatus, ModelStore};
pub use trainer::Trainer;
