//! Estimators Module - tree ensembles behind the predictive models
//!
//! - `forest.rs`: Random forest failure classifier
//! - `isolation.rs`: Isolation forest outlier detector
//!
//! Both are seeded and serializable so they can be persisted as artifacts.

pub mod forest;
pub mod isolation;


pub use forest::{ForestParams, RandomForestClassifier};
pub use isolation::{IsolationForest, IsolationParams, ANOMALY, NORMAL};
