use image::{ImageBuffer, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use photoframe_cropper::image_processing::crop_window::{CropWindow, SolveMethod};
use photoframe_cropper::{
    BatchOptions, CropConfig, CropDecision, DetectionChain, DetectionError, ProcessingEngine,
    Subject, SubjectDetector, SubjectKind,
};

/// Returns the same boxes for every frame.
struct FixedDetector {
    name: &'static str,
    kind: SubjectKind,
    subjects: Vec<Subject>,
}

impl SubjectDetector for FixedDetector {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> SubjectKind {
        self.kind
    }

    fn detect(&self, _img: &RgbImage) -> Result<Vec<Subject>, DetectionError> {
        Ok(self.subjects.clone())
    }
}

/// Always fails, like a backend whose runtime broke mid-batch.
struct BrokenDetector;

impl SubjectDetector for BrokenDetector {
    fn name(&self) -> &str {
        "broken"
    }

    fn kind(&self) -> SubjectKind {
        SubjectKind::Face
    }

    fn detect(&self, _img: &RgbImage) -> Result<Vec<Subject>, DetectionError> {
        Err(DetectionError::Inference("device lost".to_string()))
    }
}

fn faces(subjects: Vec<Subject>) -> Box<dyn SubjectDetector> {
    Box::new(FixedDetector {
        name: "faces",
        kind: SubjectKind::Face,
        subjects,
    })
}

fn people(subjects: Vec<Subject>) -> Box<dyn SubjectDetector> {
    Box::new(FixedDetector {
        name: "people",
        kind: SubjectKind::Person,
        subjects,
    })
}

/// Each row gets its own color so crops can be checked against the source.
fn striped(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |_, y| {
        Rgb([(y % 256) as u8, (y / 256) as u8, 128])
    })
}

fn save_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    striped(width, height).save(&path).unwrap();
    path
}

fn engine(detectors: Vec<Box<dyn SubjectDetector>>) -> ProcessingEngine {
    let config = CropConfig::default();
    let chain = DetectionChain::new(detectors, &config);
    let options = BatchOptions {
        parallel_jobs: 2,
        ..BatchOptions::default()
    };
    ProcessingEngine::new(config, chain, options).unwrap()
}

fn window_of(decision: &Option<CropDecision>) -> CropWindow {
    decision
        .as_ref()
        .and_then(|d| d.window())
        .expect("image should have been cropped")
}

#[test]
fn portrait_face_near_top_is_kept() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let source = save_png(input.path(), "portrait.png", 1280, 2000);

    let engine = engine(vec![faces(vec![Subject::face(500.0, 100.0, 200.0, 200.0, 0.95)])]);
    let report = engine.process_batch(&[source], output.path(), |_, _, _| {}).unwrap();

    assert_eq!(report.successful(), 1);
    let result = &report.results[0];
    let window = window_of(&result.decision);
    assert_eq!(window.height(), 800);
    assert!(window.y_min <= 100 && window.y_max >= 300, "window {:?}", window);
    assert!(matches!(
        result.decision,
        Some(CropDecision::SubjectAware { ref detector, .. }) if detector == "faces"
    ));

    let written = image::open(output.path().join("processed_portrait.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(written.dimensions(), (1280, 800));
    assert_eq!(written.get_pixel(0, 0), striped(1, 2000).get_pixel(0, window.y_min));
}

#[test]
fn subjects_taller_than_target_are_truncated_from_the_top() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let source = save_png(input.path(), "group.png", 1280, 1500);

    let engine = engine(vec![faces(vec![
        Subject::face(600.0, 170.0, 60.0, 60.0, 0.9),
        Subject::face(600.0, 1270.0, 60.0, 60.0, 0.9),
    ])]);
    let report = engine.process_batch(&[source], output.path(), |_, _, _| {}).unwrap();

    let decision = report.results[0].decision.clone().unwrap();
    assert!(decision.truncated());
    assert_eq!(decision.window(), Some(CropWindow::new(170, 970)));
    match decision {
        CropDecision::SubjectAware { solution, .. } => {
            assert_eq!(solution.method, SolveMethod::Truncated)
        }
        other => panic!("unexpected decision {:?}", other),
    }
    assert_eq!(report.decision_counts().truncated, 1);
}

#[test]
fn short_image_is_written_unmodified() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let source = save_png(input.path(), "wide.png", 1280, 700);

    let calls = AtomicUsize::new(0);
    let report = engine(vec![faces(vec![Subject::face(10.0, 10.0, 100.0, 100.0, 0.9)])])
        .process_batch(&[source], output.path(), |count, fraction, _| {
            calls.fetch_add(1, Ordering::Relaxed);
            assert_eq!(count, 1);
            assert_eq!(fraction, 1.0);
        })
        .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(
        report.results[0].decision,
        Some(CropDecision::NotNeeded { height: 700 })
    );

    let written = image::open(output.path().join("processed_wide.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(written, striped(1280, 700));
}

#[test]
fn nothing_detected_falls_back_to_center_crop() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let source = save_png(input.path(), "empty.png", 1280, 2000);

    let report = engine(vec![people(Vec::new()), faces(Vec::new())])
        .process_batch(&[source], output.path(), |_, _, _| {})
        .unwrap();

    assert_eq!(
        report.results[0].decision,
        Some(CropDecision::Centered {
            window: CropWindow::new(600, 1400)
        })
    );
    assert_eq!(report.decision_counts().centered, 1);
}

#[test]
fn failing_face_backend_falls_through_to_people() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let source = save_png(input.path(), "crowd.png", 1280, 2000);

    let report = engine(vec![
        people(vec![Subject::person(400.0, 1000.0, 300.0, 600.0, 0.8)]),
        Box::new(BrokenDetector),
    ])
    .process_batch(&[source], output.path(), |_, _, _| {})
    .unwrap();

    let result = &report.results[0];
    assert!(result.is_success());
    let window = window_of(&result.decision);
    assert!(window.y_min <= 1000 && window.y_max >= 1600, "window {:?}", window);
    assert!(matches!(
        result.decision,
        Some(CropDecision::SubjectAware { ref detector, .. }) if detector == "people"
    ));
}

#[test]
fn corrupt_file_fails_alone() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let good = save_png(input.path(), "good.png", 1280, 2000);
    let bad = input.path().join("bad.jpg");
    fs::write(&bad, b"definitely not a jpeg").unwrap();

    let report = engine(Vec::new())
        .process_batch(&[bad.clone(), good], output.path(), |_, _, _| {})
        .unwrap();

    assert_eq!(report.total(), 2);
    assert_eq!(report.successful(), 1);
    assert_eq!(report.successful_filenames(), vec!["processed_good.png".to_string()]);

    let failure = report.failures().next().unwrap();
    assert_eq!(failure.source_path, bad);
    assert!(failure.error.as_deref().unwrap().contains("bad.jpg"));
    assert!(!output.path().join("processed_bad.jpg").exists());
}

#[test]
fn write_failure_is_reported_per_image() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let blocked = save_png(input.path(), "blocked.png", 1280, 900);
    let fine = save_png(input.path(), "fine.png", 1280, 900);

    // A directory where the output file should go makes the save fail
    fs::create_dir(output.path().join("processed_blocked.png")).unwrap();

    let report = engine(Vec::new())
        .process_batch(&[blocked, fine], output.path(), |_, _, _| {})
        .unwrap();

    assert_eq!(report.successful(), 1);
    assert_eq!(report.failed(), 1);
    assert!(report.results[0].error.as_deref().unwrap().contains("Failed to save"));
    assert!(output.path().join("processed_fine.png").is_file());
}

#[test]
fn dry_run_reports_names_without_writing() {
    let input = tempfile::tempdir().unwrap();
    let output = input.path().join("not-created");
    let source = save_png(input.path(), "trip.png", 1280, 2000);

    let config = CropConfig::default();
    let chain = DetectionChain::new(Vec::new(), &config);
    let engine = ProcessingEngine::new(
        config,
        chain,
        BatchOptions {
            dry_run: true,
            ..BatchOptions::default()
        },
    )
    .unwrap();

    let report = engine.process_batch(&[source], &output, |_, _, _| {}).unwrap();

    assert_eq!(report.successful_filenames(), vec!["processed_trip.png".to_string()]);
    assert!(!output.exists());
}

#[test]
fn discovered_images_are_processed_in_order() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for name in ["c.png", "a.png", "b.png"] {
        save_png(input.path(), name, 640, 360);
    }
    fs::write(input.path().join("notes.txt"), b"skip me").unwrap();

    let engine = engine(Vec::new());
    let files = engine.discover_images(&[input.path().to_path_buf()]).unwrap();
    let report = engine.process_batch(&files, output.path(), |_, _, _| {}).unwrap();

    assert_eq!(
        report.successful_filenames(),
        vec!["processed_a.png", "processed_b.png", "processed_c.png"]
    );
    let written = image::open(output.path().join("processed_a.png")).unwrap();
    assert_eq!((written.width(), written.height()), (1280, 720));
    assert_eq!(report.decision_counts().not_needed, 3);
}
