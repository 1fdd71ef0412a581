//! Segmentation backend implementations
//!
//! - ONNX Runtime backend for the rembg model family (feature `onnx`)
//! - Deterministic mock backend for tests

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "onnx")]
pub use self::onnx::{default_model_dir, ExecutionProvider, OnnxBackend, OnnxSession};
