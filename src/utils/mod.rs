//! Shared utilities for tensor conversion and numeric validation

pub mod preprocessing;
pub mod validation;

pub use preprocessing::ImagePreprocessor;
pub use validation::NumericValidator;
