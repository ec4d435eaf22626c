pub mod batch;
pub mod crop_window;
#[cfg(feature = "face")]
pub mod face_detection;
#[cfg(feature = "ai")]
pub mod onnx_detection;
pub mod orientation;
pub mod pipeline;
pub mod resize;
pub mod subject;
pub mod subject_detection;
pub mod weighting;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ConfigError;
use crate::utils::has_valid_extension;
use batch::{process_files_parallel, BatchReport};
use pipeline::ImageTransformPipeline;
use subject_detection::DetectionChain;

/// Tunables of the crop. Built once per run and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropConfig {
    /// Output width in pixels; every image is scaled to it.
    pub target_width: u32,
    /// Maximum output height in pixels.
    pub target_height: u32,
    /// Detections below this confidence are ignored.
    pub min_detection_confidence: f32,
    /// Padding around the primary subjects as a fraction of their average height.
    pub face_padding_ratio: f32,
    /// Upper bound of that padding in pixels.
    pub max_face_padding_px: u32,
    /// Detections covering less than this fraction of the frame are ignored.
    pub face_size_threshold: f32,
    pub portrait_face_weight: f32,
    pub portrait_upper_bias: f32,
    pub portrait_top_padding_ratio: f32,
    pub portrait_bottom_padding_ratio: f32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            target_width: 1280,
            target_height: 800,
            min_detection_confidence: 0.5,
            face_padding_ratio: 0.3,
            max_face_padding_px: 100,
            face_size_threshold: 0.0005,
            portrait_face_weight: 1.2,
            portrait_upper_bias: 1.3,
            portrait_top_padding_ratio: 0.5,
            portrait_bottom_padding_ratio: 1.5,
        }
    }
}

impl CropConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ConfigError::ZeroTargetSize {
                width: self.target_width,
                height: self.target_height,
            });
        }

        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("face_size_threshold", self.face_size_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }

        for (name, value) in [
            ("face_padding_ratio", self.face_padding_ratio),
            ("portrait_face_weight", self.portrait_face_weight),
            ("portrait_upper_bias", self.portrait_upper_bias),
            ("portrait_top_padding_ratio", self.portrait_top_padding_ratio),
            ("portrait_bottom_padding_ratio", self.portrait_bottom_padding_ratio),
        ] {
            // NaN fails this too
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { name, value });
            }
        }

        Ok(())
    }
}

/// How a batch finds and writes its files.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    /// Descend into subdirectories instead of scanning only the top level.
    pub recursive: bool,
    /// Worker threads; 0 uses one per CPU.
    pub parallel_jobs: usize,
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
            ],
            recursive: false,
            parallel_jobs: 0,
            dry_run: false,
        }
    }
}

pub struct ProcessingEngine {
    pipeline: ImageTransformPipeline,
    options: BatchOptions,
    pool: rayon::ThreadPool,
}

impl ProcessingEngine {
    pub fn new(config: CropConfig, chain: DetectionChain, options: BatchOptions) -> Result<Self> {
        config.validate().context("Invalid crop configuration")?;

        let threads = if options.parallel_jobs == 0 {
            num_cpus::get()
        } else {
            options.parallel_jobs
        };

        // Local pool so several engines can coexist in one process
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("cropper-{}", i))
            .build()
            .context("Failed to initialize thread pool")?;

        let pipeline =
            ImageTransformPipeline::new(Arc::new(config), Arc::new(chain)).dry_run(options.dry_run);

        Ok(Self {
            pipeline,
            options,
            pool,
        })
    }

    pub fn config(&self) -> &CropConfig {
        self.pipeline.config()
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Collect image files from the given directories and files, sorted and
    /// without duplicates.
    pub fn discover_images(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut image_files = Vec::new();
        let max_depth = if self.options.recursive { usize::MAX } else { 1 };

        for input in inputs {
            if input.is_file() {
                if has_valid_extension(input, &self.options.extensions) {
                    image_files.push(input.clone());
                } else {
                    warn!("Skipping {}: unsupported extension", input.display());
                }
                continue;
            }

            debug!("Scanning directory: {}", input.display());

            let walker = WalkDir::new(input).follow_links(false).max_depth(max_depth);

            for entry in walker {
                let entry = entry.context("Failed to read directory entry")?;
                let path = entry.path();

                if entry.file_type().is_file() && has_valid_extension(path, &self.options.extensions) {
                    image_files.push(path.to_path_buf());
                }
            }
        }

        image_files.sort();
        image_files.dedup();

        info!("Found {} image files", image_files.len());
        Ok(image_files)
    }

    /// Process every file in parallel and collect one result per file.
    ///
    /// The callback receives the completed count, the fraction done and an ETA
    /// after each image.
    pub fn process_batch<P>(
        &self,
        image_files: &[PathBuf],
        output_dir: &Path,
        progress_callback: P,
    ) -> Result<BatchReport>
    where
        P: Fn(usize, f64, Option<Duration>) + Send + Sync,
    {
        if !self.options.dry_run {
            std::fs::create_dir_all(output_dir).with_context(|| {
                format!("Failed to create output directory: {}", output_dir.display())
            })?;
        }

        let start = Instant::now();
        info!(
            "Processing {} images on {} threads",
            image_files.len(),
            self.threads()
        );

        let pipeline = &self.pipeline;
        let results = self.pool.install(|| {
            process_files_parallel(
                image_files,
                |path| pipeline.process(path, output_dir),
                progress_callback,
            )
        });

        let report = BatchReport {
            results,
            total_duration: start.elapsed(),
        };
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.successful(),
            report.failed()
        );

        Ok(report)
    }
}
