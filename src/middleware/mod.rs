//! Request middleware and extractors

pub mod validate;
