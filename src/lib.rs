// Library exports for the binary and the integration tests
pub mod cli;
pub mod config_file;
pub mod error;
pub mod image_processing;
pub mod slideshow;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, DetectionError, TransformError};
pub use image_processing::batch::BatchReport;
pub use image_processing::pipeline::{CropDecision, ImageTransformPipeline, ProcessResult};
pub use image_processing::subject::{Orientation, Subject, SubjectKind};
pub use image_processing::subject_detection::{DetectionChain, SubjectDetector};
pub use image_processing::{BatchOptions, CropConfig, ProcessingEngine};
