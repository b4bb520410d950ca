//! HTTP handlers

pub mod health;
pub mod maintenance;
pub mod anomaly;
pub mod utilization;
pub mod forecast;
pub mod batch;
pub mod model_info;
