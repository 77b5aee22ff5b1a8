//! HTTP routes

pub mod error;
pub mod health;
pub mod pdf;

pub use error::ApiError;
