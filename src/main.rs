use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::Path;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use photoframe_cropper::cli::Args;
use photoframe_cropper::image_processing::batch::BatchReport;
use photoframe_cropper::image_processing::subject_detection::{DetectionChain, SubjectDetector};
use photoframe_cropper::image_processing::{CropConfig, ProcessingEngine};
use photoframe_cropper::slideshow::{write_slideshow, SlideshowOptions};
use photoframe_cropper::utils::{
    create_progress_bar, error_println, format_duration, validate_inputs, warn_println,
};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "photoframe_cropper=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "face")]
fn face_detector(path: &Path) -> Option<Box<dyn SubjectDetector>> {
    use photoframe_cropper::image_processing::face_detection::SeetaFaceDetector;

    match SeetaFaceDetector::from_model_file(path) {
        Ok(detector) => Some(Box::new(detector)),
        Err(e) => {
            warn_println(&format!("{}; face detection disabled", e));
            None
        }
    }
}

#[cfg(not(feature = "face"))]
fn face_detector(path: &Path) -> Option<Box<dyn SubjectDetector>> {
    warn_println(&format!(
        "Ignoring face model {}: rebuild with --features face to enable face detection",
        path.display()
    ));
    None
}

#[cfg(feature = "ai")]
fn person_detector(path: &Path) -> Option<Box<dyn SubjectDetector>> {
    use photoframe_cropper::image_processing::onnx_detection::YoloPersonDetector;

    match YoloPersonDetector::from_model_file(path) {
        Ok(detector) => Some(Box::new(detector)),
        Err(e) => {
            warn_println(&format!("{}; people detection disabled", e));
            None
        }
    }
}

#[cfg(not(feature = "ai"))]
fn person_detector(path: &Path) -> Option<Box<dyn SubjectDetector>> {
    warn_println(&format!(
        "Ignoring person model {}: rebuild with --features ai to enable people detection",
        path.display()
    ));
    None
}

/// Detectors whose models loaded. A model that fails to load only costs its adapter.
fn build_detection_chain(args: &Args, config: &CropConfig) -> DetectionChain {
    let detectors: Vec<Box<dyn SubjectDetector>> = [
        args.face_model.as_deref().and_then(face_detector),
        args.person_model.as_deref().and_then(person_detector),
    ]
    .into_iter()
    .flatten()
    .collect();

    DetectionChain::new(detectors, config)
}

fn print_configuration(args: &Args, config: &CropConfig, detectors: &[String], threads: usize) {
    println!("{}", style("Configuration:").bold());
    if let Some(path) = &args.config_file {
        println!("  Config file: {}", path.display());
    }
    println!("  Target size: {}x{}", config.target_width, config.target_height);
    println!("  Output directory: {}", args.output_dir().display());
    println!("  Extensions: {:?}", args.parse_extensions());
    println!("  Recursive: {}", args.recursive);
    println!("  Parallel jobs: {}", threads);
    if detectors.is_empty() {
        println!("  Detectors: none (center crop only)");
    } else {
        println!("  Detectors: {}", detectors.join(" -> "));
    }
    println!("  Min confidence: {}", config.min_detection_confidence);
    println!(
        "  Padding: {} of subject height, max {}px",
        config.face_padding_ratio, config.max_face_padding_px
    );
    println!(
        "  Portrait: weight {}, upper bias {}, padding {} above / {} below",
        config.portrait_face_weight,
        config.portrait_upper_bias,
        config.portrait_top_padding_ratio,
        config.portrait_bottom_padding_ratio
    );
    if args.dry_run {
        println!("  Dry run mode: enabled (no files will be written)");
    }
    println!();
}

fn print_summary(report: &BatchReport, dry_run: bool) {
    let header = if dry_run {
        style("Dry Run Results Summary:").bold().cyan()
    } else {
        style("Results Summary:").bold().green()
    };
    println!("{}", header);

    let processed_label = if dry_run {
        "Would be processed"
    } else {
        "Successfully processed"
    };
    println!(
        "  {}: {}",
        processed_label,
        style(report.successful()).bold().green()
    );
    if report.failed() > 0 {
        println!("  Failed: {}", style(report.failed()).bold().red());
    }

    let counts = report.decision_counts();
    println!();
    println!("{}", style("Crop Decisions:").bold().blue());
    println!("  Subject-aware: {}", style(counts.subject_aware).cyan());
    println!("  Centered (nothing detected): {}", style(counts.centered).cyan());
    println!("  Not needed: {}", style(counts.not_needed).cyan());
    if counts.truncated > 0 {
        println!(
            "  Subjects taller than the display: {}",
            style(counts.truncated).bold().yellow()
        );
    }

    println!();
    println!(
        "  Total time: {}  (avg {} per image)",
        style(format_duration(report.total_duration)).bold(),
        format_duration(report.average_time())
    );

    if report.failed() > 0 {
        println!();
        println!("{}", style("Errors:").bold().red());
        for failure in report.failures() {
            println!(
                "  {}: {}",
                style(failure.source_path.display()).yellow(),
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let mut args = Args::parse();
    let loaded_config = args.load_and_merge_config()?;

    init_tracing(args.verbose);
    if let Some(path) = &loaded_config {
        info!("Loaded configuration from: {}", path.display());
    }

    println!("{}", style("Photo Frame Cropper").bold().blue());
    println!("{}", style("Subject-aware crops for fixed-size displays").dim());
    println!();

    validate_inputs(&args)?;
    let config = args.crop_config().map_err(anyhow::Error::msg)?;
    config.validate().context("Invalid crop configuration")?;

    let chain = build_detection_chain(&args, &config);
    let detector_names = chain.detector_names();
    let engine = ProcessingEngine::new(config.clone(), chain, args.batch_options())?;

    if args.verbose {
        print_configuration(&args, &config, &detector_names, engine.threads());
    }

    let image_files = engine.discover_images(&args.input_paths)?;
    if image_files.is_empty() {
        error_println("No images found with specified extensions");
        return Err(anyhow::anyhow!("No output produced"));
    }

    let output_dir = args.output_dir();
    let progress = create_progress_bar(image_files.len() as u64);
    progress.set_message("Processing images");

    let report = engine.process_batch(&image_files, &output_dir, |completed, _, _| {
        progress.set_position(completed as u64);
    })?;
    progress.finish_with_message("Processing complete");
    println!();

    print_summary(&report, args.dry_run);

    if report.successful() == 0 {
        return Err(anyhow::anyhow!(
            "No output produced: all {} images failed",
            report.total()
        ));
    }

    if args.write_slideshow() {
        let options = SlideshowOptions::new(config.target_width, config.target_height)
            .with_weather(args.weather_api_key.as_deref(), args.weather_zip.as_deref());
        if args.weather_api_key.is_some() && options.weather.is_none() {
            warn_println("Weather display needs both an API key and a ZIP code; disabled");
        }

        let html_path = write_slideshow(&output_dir, &report.successful_filenames(), &options)?;
        println!();
        println!("Slideshow: {}", style(html_path.display()).bold());
        println!("Open it in a web browser to view the slideshow");
    }

    println!();
    println!(
        "{} {}",
        style("Done in").dim(),
        style(format_duration(start_time.elapsed())).bold()
    );

    Ok(())
}
