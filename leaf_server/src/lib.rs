//! Mango leaf disease classification: model loading, calibrated inference and the REST API.
pub mod calibration;
pub mod catalog;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod inferer;
pub mod meter;
pub mod model_store;
pub mod nn;
pub mod prediction;
