use thiserror::Error;

/// Invalid values in a [`crate::CropConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("target dimensions must be greater than 0, got {width}x{height}")]
    ZeroTargetSize { width: u32, height: u32 },

    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
}

/// Faults raised inside a detector backend.
///
/// These never leave the detection chain: they are logged and the adapter is
/// treated as having found nothing.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("malformed detector output: {0}")]
    MalformedOutput(String),
}

/// Errors from the pixel-level transform steps.
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("image dimensions are zero ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("crop rows {y_min}..{y_max} exceed image height {height}")]
    CropOutOfBounds { y_min: u32, y_max: u32, height: u32 },

    #[error("resize failed: {0}")]
    Resize(String),
}
