use crate::cli::Args;
use crate::image_processing::CropConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// JSON configuration file. Every key is optional; keys set on the command
/// line win over the file.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    pub input_paths: Option<Vec<PathBuf>>,
    pub output_path: Option<PathBuf>,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub extensions: Option<String>,
    pub recursive: Option<bool>,
    pub jobs: Option<usize>,
    pub face_model: Option<PathBuf>,
    pub person_model: Option<PathBuf>,
    pub min_detection_confidence: Option<f32>,
    pub face_padding_ratio: Option<f32>,
    pub max_face_padding_px: Option<u32>,
    pub face_size_threshold: Option<f32>,
    pub portrait_face_weight: Option<f32>,
    pub portrait_upper_bias: Option<f32>,
    pub portrait_top_padding_ratio: Option<f32>,
    pub portrait_bottom_padding_ratio: Option<f32>,
    pub slideshow: Option<bool>,
    pub weather_api_key: Option<String>,
    pub weather_zip: Option<String>,
    pub dry_run: Option<bool>,
    pub verbose: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl Args {
    /// Load the `--config` file, if any, and fill every option the command
    /// line left unset.
    ///
    /// Runs before logging is set up, since the file may switch on verbose
    /// output; returns the path that was loaded so the caller can report it.
    pub fn load_and_merge_config(&mut self) -> Result<Option<PathBuf>> {
        let Some(config_path) = self.config_file.clone() else {
            return Ok(None);
        };

        let config = ConfigFile::load(&config_path)?;
        self.merge_from_config(config);
        Ok(Some(config_path))
    }

    pub fn merge_from_config(&mut self, config: ConfigFile) {
        if self.input_paths.is_empty() {
            self.input_paths = config.input_paths.unwrap_or_default();
        }

        fill(&mut self.output_dir, config.output_path);
        fill(&mut self.extensions_str, config.extensions);
        fill(&mut self.jobs, config.jobs);
        fill(&mut self.face_model, config.face_model);
        fill(&mut self.person_model, config.person_model);
        fill(&mut self.confidence, config.min_detection_confidence);
        fill(&mut self.face_padding_ratio, config.face_padding_ratio);
        fill(&mut self.max_face_padding_px, config.max_face_padding_px);
        fill(&mut self.face_size_threshold, config.face_size_threshold);
        fill(&mut self.portrait_face_weight, config.portrait_face_weight);
        fill(&mut self.portrait_upper_bias, config.portrait_upper_bias);
        fill(&mut self.portrait_top_padding_ratio, config.portrait_top_padding_ratio);
        fill(&mut self.portrait_bottom_padding_ratio, config.portrait_bottom_padding_ratio);
        fill(&mut self.weather_api_key, config.weather_api_key);
        fill(&mut self.weather_zip, config.weather_zip);

        // Size is one flag on the command line but two keys in the file
        if self.size.is_none() && (config.target_width.is_some() || config.target_height.is_some()) {
            let defaults = CropConfig::default();
            self.size = Some(format!(
                "{}x{}",
                config.target_width.unwrap_or(defaults.target_width),
                config.target_height.unwrap_or(defaults.target_height)
            ));
        }

        // Boolean flags can only be switched on from the command line
        self.recursive |= config.recursive.unwrap_or(false);
        self.dry_run |= config.dry_run.unwrap_or(false);
        self.verbose |= config.verbose.unwrap_or(false);
        if config.slideshow == Some(false) {
            self.no_slideshow = true;
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}
