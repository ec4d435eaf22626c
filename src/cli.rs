use clap::Parser;
use std::path::PathBuf;

use crate::image_processing::{BatchOptions, CropConfig};

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_EXTENSIONS: &str = "jpg,jpeg,png,gif";

#[derive(Parser, Debug)]
#[command(
    name = "photoframe-cropper",
    version,
    about = "Subject-aware photo cropper for fixed-size photo frame displays",
    long_about = "
Photo Frame Cropper

Scales every photo to the display width and, when the result is taller than the
display, keeps the band of rows that best frames the detected faces or people.
Photos without detections are cropped around their middle. A browser slideshow
(index.html) is written next to the processed images.

Tuning flags left unset fall back to the JSON file given with --config, then to
built-in defaults.

Example Usage:
  # Crop a folder for a 1280x800 display
  photoframe-cropper -i ~/Photos -o ~/frame

  # Use a SeetaFace model (build with --features face)
  photoframe-cropper -i ~/Photos -o ~/frame --face-model ./seeta_fd_frontal_v1.0.bin

  # Add YOLO people detection as fallback (build with --features ai)
  photoframe-cropper -i ~/Photos --face-model ./seeta.bin --person-model ./yolo11n.onnx

  # Different display, recursive scan, see what would happen
  photoframe-cropper -i ~/Photos -s 800x480 --recursive --dry-run --verbose"
)]
pub struct Args {
    /// Input directories or single image files (can be specified multiple times)
    #[arg(short = 'i', long = "input", value_name = "DIR|FILE")]
    pub input_paths: Vec<PathBuf>,

    /// Output directory for processed images [default: output]
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file; command-line flags take precedence
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Target display size [default: 1280x800]
    #[arg(short = 's', long = "size", value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Comma-separated file extensions to process [default: jpg,jpeg,png,gif]
    #[arg(long = "extensions", value_name = "LIST")]
    pub extensions_str: Option<String>,

    /// Also scan subdirectories of input directories
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Number of parallel jobs (0 = one per CPU)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// SeetaFace model file for face detection
    #[arg(long = "face-model", value_name = "FILE")]
    pub face_model: Option<PathBuf>,

    /// YOLO ONNX model file for people detection
    #[arg(long = "person-model", value_name = "FILE")]
    pub person_model: Option<PathBuf>,

    /// Minimum detection confidence (0.0-1.0) [default: 0.5]
    #[arg(long = "confidence", value_name = "THRESHOLD")]
    pub confidence: Option<f32>,

    /// Padding around subjects as a fraction of their height [default: 0.3]
    #[arg(long = "face-padding", value_name = "RATIO")]
    pub face_padding_ratio: Option<f32>,

    /// Maximum padding around subjects in pixels [default: 100]
    #[arg(long = "max-face-padding", value_name = "PX")]
    pub max_face_padding_px: Option<u32>,

    /// Ignore detections smaller than this fraction of the frame [default: 0.0005]
    #[arg(long = "min-face-size", value_name = "FRACTION")]
    pub face_size_threshold: Option<f32>,

    /// Weight of vertical position for portrait photos [default: 1.2]
    #[arg(long = "portrait-face-weight", value_name = "WEIGHT")]
    pub portrait_face_weight: Option<f32>,

    /// Preference for subjects in the upper half of portrait photos [default: 1.3]
    #[arg(long = "portrait-upper-bias", value_name = "BIAS")]
    pub portrait_upper_bias: Option<f32>,

    /// Share of the padding kept above portrait subjects [default: 0.5]
    #[arg(long = "portrait-top-padding", value_name = "RATIO")]
    pub portrait_top_padding_ratio: Option<f32>,

    /// Share of the padding kept below portrait subjects [default: 1.5]
    #[arg(long = "portrait-bottom-padding", value_name = "RATIO")]
    pub portrait_bottom_padding_ratio: Option<f32>,

    /// Do not write the index.html slideshow
    #[arg(long = "no-slideshow")]
    pub no_slideshow: bool,

    /// OpenWeatherMap API key for the slideshow weather display
    #[arg(long = "weather-api-key", value_name = "KEY")]
    pub weather_api_key: Option<String>,

    /// US ZIP code for the slideshow weather display
    #[arg(long = "weather-zip", value_name = "ZIP")]
    pub weather_zip: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Run detection and cropping without writing any file
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Args {
    /// Parse the size string into width and height
    pub fn parse_size(&self) -> Result<Option<(u32, u32)>, String> {
        let Some(size) = self.size.as_deref() else {
            return Ok(None);
        };

        let (width, height) = size.split_once(['x', 'X']).ok_or_else(|| {
            format!("Invalid size format '{}'. Use WIDTHxHEIGHT (e.g., 1280x800)", size)
        })?;

        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid width: '{}'", width))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid height: '{}'", height))?;

        if width == 0 || height == 0 {
            return Err("Width and height must be greater than 0".to_string());
        }

        Ok(Some((width, height)))
    }

    /// Parse the extensions string into a vector
    pub fn parse_extensions(&self) -> Vec<String> {
        self.extensions_str
            .as_deref()
            .unwrap_or(DEFAULT_EXTENSIONS)
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// Crop tunables from the flags, falling back to defaults.
    pub fn crop_config(&self) -> Result<CropConfig, String> {
        let defaults = CropConfig::default();
        let (target_width, target_height) = self
            .parse_size()?
            .unwrap_or((defaults.target_width, defaults.target_height));

        Ok(CropConfig {
            target_width,
            target_height,
            min_detection_confidence: self
                .confidence
                .unwrap_or(defaults.min_detection_confidence),
            face_padding_ratio: self.face_padding_ratio.unwrap_or(defaults.face_padding_ratio),
            max_face_padding_px: self.max_face_padding_px.unwrap_or(defaults.max_face_padding_px),
            face_size_threshold: self.face_size_threshold.unwrap_or(defaults.face_size_threshold),
            portrait_face_weight: self
                .portrait_face_weight
                .unwrap_or(defaults.portrait_face_weight),
            portrait_upper_bias: self.portrait_upper_bias.unwrap_or(defaults.portrait_upper_bias),
            portrait_top_padding_ratio: self
                .portrait_top_padding_ratio
                .unwrap_or(defaults.portrait_top_padding_ratio),
            portrait_bottom_padding_ratio: self
                .portrait_bottom_padding_ratio
                .unwrap_or(defaults.portrait_bottom_padding_ratio),
        })
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            extensions: self.parse_extensions(),
            recursive: self.recursive,
            parallel_jobs: self.jobs.unwrap_or(0),
            dry_run: self.dry_run,
        }
    }

    pub fn write_slideshow(&self) -> bool {
        !self.no_slideshow && !self.dry_run
    }
}
