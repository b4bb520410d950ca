//! AssetPro ML Service
//!
//! Predictive maintenance and utilization analytics for physical assets.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ASSETPRO ML SERVICE                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌─────────────┐  ┌───────────────────────┐ │
//! │  │  HTTP API │  │  Predictor  │  │  Optimizer/Forecaster │ │
//! │  │  (Axum)   │  │  Trainer    │  │  (pure functions)     │ │
//! │  └─────┬─────┘  └──────┬──────┘  └───────────────────────┘ │
//! │        └───────────────┤                                    │
//! │                        ▼                                    │
//! │                ┌──────────────┐      ┌──────────────┐      │
//! │                │ Model Store  │ ───▶ │ Dataset CSV  │      │
//! │                │ (JSON files) │      └──────────────┘      │
//! │                └──────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use logic::{ModelStore, Predictor};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub predictor: Arc<Predictor>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let store = Arc::new(ModelStore::new(&config.models));
        Self {
            predictor: Arc::new(Predictor::new(store.clone())),
            store,
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/model-info", get(handlers::model_info::info))

        // Predictive maintenance
        .route("/predict-maintenance", post(handlers::maintenance::predict))
        .route("/train-maintenance-model", post(handlers::maintenance::train))

        // Anomaly detection
        .route("/anomaly-insights", post(handlers::anomaly::insights))
        .route("/train-anomaly-model", post(handlers::anomaly::train))

        // Analytics
        .route("/optimize-utilization", post(handlers::utilization::optimize))
        .route("/forecast-lifecycle", post(handlers::forecast::lifecycle))
        .route("/batch-predictions", post(handlers::batch::predictions))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
