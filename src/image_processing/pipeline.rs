//! Per-image transform: load, resize to the frame width, pick the rows to keep,
//! crop and save.

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::crop_window::{center_window, solve_crop_window, CropSolution, CropWindow};
use super::orientation::load_upright;
use super::resize::{crop_rows, resize_to_width};
use super::subject::Orientation;
use super::subject_detection::DetectionChain;
use super::weighting::weigh_subjects;
use super::CropConfig;
use crate::utils::output_filename;

/// What the pipeline decided to do with the rows of a resized frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CropDecision {
    /// The resized frame is not taller than the target and is kept whole.
    NotNeeded { height: u32 },
    /// Nothing was detected; the frame is cropped around its middle.
    Centered { window: CropWindow },
    /// The window was solved from detected subjects.
    SubjectAware {
        solution: CropSolution,
        subject_count: usize,
        detector: String,
    },
}

impl CropDecision {
    /// Rows to keep, or `None` when the frame is kept as is.
    pub fn window(&self) -> Option<CropWindow> {
        match self {
            CropDecision::NotNeeded { .. } => None,
            CropDecision::Centered { window } => Some(*window),
            CropDecision::SubjectAware { solution, .. } => Some(solution.window),
        }
    }

    /// Primary subjects could not all fit in the target height.
    pub fn truncated(&self) -> bool {
        matches!(self, CropDecision::SubjectAware { solution, .. } if solution.truncated())
    }
}

/// Outcome of one image. Failures carry the error message and no filename.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub source_path: PathBuf,
    pub output_filename: Option<String>,
    pub decision: Option<CropDecision>,
    pub error: Option<String>,
    pub processing_time: Duration,
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        self.output_filename.is_some()
    }
}

/// Decide which rows of an already resized frame to keep.
pub fn plan_crop(
    frame: &RgbImage,
    orientation: Orientation,
    chain: &DetectionChain,
    config: &CropConfig,
) -> CropDecision {
    let (width, height) = frame.dimensions();
    let target = config.target_height;

    if height <= target {
        return CropDecision::NotNeeded { height };
    }

    let detection = chain.detect(frame);
    let detector = match detection.detector {
        Some(name) if !detection.subjects.is_empty() => name,
        _ => {
            return CropDecision::Centered {
                window: center_window(height, target),
            }
        }
    };

    let subject_count = detection.subjects.len();
    let ranking = weigh_subjects(detection.subjects, width, height, orientation, config);

    match solve_crop_window(&ranking, height, target, orientation, config) {
        Some(solution) => CropDecision::SubjectAware {
            solution,
            subject_count,
            detector,
        },
        None => CropDecision::Centered {
            window: center_window(height, target),
        },
    }
}

/// Transforms single images with a shared, read-only configuration.
#[derive(Clone)]
pub struct ImageTransformPipeline {
    config: Arc<CropConfig>,
    chain: Arc<DetectionChain>,
    dry_run: bool,
}

impl ImageTransformPipeline {
    pub fn new(config: Arc<CropConfig>, chain: Arc<DetectionChain>) -> Self {
        Self {
            config,
            chain,
            dry_run: false,
        }
    }

    /// Run every step but skip writing the output file.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// Process one file. Never fails: errors become a failed result.
    pub fn process(&self, input_path: &Path, output_dir: &Path) -> ProcessResult {
        let start = Instant::now();
        debug!("Processing: {}", input_path.display());

        match self.transform_file(input_path, output_dir) {
            Ok((filename, decision)) => {
                if decision.truncated() {
                    warn!(
                        "{}: primary subjects are taller than {}px, lower subjects were cropped",
                        input_path.display(),
                        self.config.target_height
                    );
                }
                ProcessResult {
                    source_path: input_path.to_path_buf(),
                    output_filename: Some(filename),
                    decision: Some(decision),
                    error: None,
                    processing_time: start.elapsed(),
                }
            }
            Err(e) => {
                warn!("Error processing {}: {:#}", input_path.display(), e);
                ProcessResult {
                    source_path: input_path.to_path_buf(),
                    output_filename: None,
                    decision: None,
                    error: Some(format!("{:#}", e)),
                    processing_time: start.elapsed(),
                }
            }
        }
    }

    /// Resize an upright frame to the target width and crop it.
    pub fn transform_frame(&self, img: &RgbImage) -> Result<(RgbImage, CropDecision)> {
        let (width, height) = img.dimensions();
        let orientation = Orientation::from_dimensions(width, height);

        let resized = resize_to_width(img, self.config.target_width)
            .with_context(|| format!("Failed to resize {}x{} image", width, height))?;

        let decision = plan_crop(&resized, orientation, &self.chain, &self.config);
        debug!("{:?} frame {}x{} -> {:?}", orientation, resized.width(), resized.height(), decision);

        let output = match decision.window() {
            Some(window) => crop_rows(&resized, window)?,
            None => resized,
        };

        Ok((output, decision))
    }

    fn transform_file(&self, input_path: &Path, output_dir: &Path) -> Result<(String, CropDecision)> {
        let filename = output_filename(input_path).with_context(|| {
            format!("Input path has no file name: {}", input_path.display())
        })?;

        let img = load_upright(input_path)?;
        let (output, decision) = self.transform_frame(&img)?;

        if !self.dry_run {
            let output_path = output_dir.join(&filename);
            output
                .save(&output_path)
                .with_context(|| format!("Failed to save image: {}", output_path.display()))?;
        }

        Ok((filename, decision))
    }
}
