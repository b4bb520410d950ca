//! Request / response models

pub mod asset;
pub mod utilization;
pub mod forecast;

pub use asset::*;
pub use utilization::*;
pub use forecast::*;
