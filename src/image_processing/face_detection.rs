/// Face detection backed by the `rustface` crate (SeetaFace engine)
use image::{DynamicImage, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::subject::{Subject, SubjectKind};
use super::subject_detection::SubjectDetector;
use crate::error::DetectionError;

/// Faces smaller than this (in pixels) are not searched for.
const MIN_FACE_SIZE: u32 = 20;

/// SeetaFace face detector loaded from a model file.
pub struct SeetaFaceDetector {
    model: rustface::Model,
}

impl SeetaFaceDetector {
    /// Load a SeetaFace frontal model (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn from_model_file(path: &Path) -> Result<Self, DetectionError> {
        let file = File::open(path).map_err(|e| {
            DetectionError::ModelLoad(format!("{}: {}", path.display(), e))
        })?;
        let model = rustface::read_model(BufReader::new(file)).map_err(|e| {
            DetectionError::ModelLoad(format!("{}: {}", path.display(), e))
        })?;

        Ok(Self { model })
    }
}

/// Map a raw SeetaFace score (unbounded, ~2.0 at the default threshold) into `[0, 1)`.
fn normalize_score(score: f64) -> f32 {
    let score = score.max(0.0);
    (score / (1.0 + score)) as f32
}

impl SubjectDetector for SeetaFaceDetector {
    fn name(&self) -> &str {
        "seetaface"
    }

    fn kind(&self) -> SubjectKind {
        SubjectKind::Face
    }

    fn detect(&self, img: &RgbImage) -> Result<Vec<Subject>, DetectionError> {
        let (width, height) = img.dimensions();
        let gray = DynamicImage::ImageRgb8(img.clone()).to_luma8();

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                Subject::face(
                    bbox.x() as f64,
                    bbox.y() as f64,
                    bbox.width() as f64,
                    bbox.height() as f64,
                    normalize_score(face.score()),
                )
            })
            .collect())
    }
}
