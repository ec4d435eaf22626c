//! Subject detection: a uniform adapter interface over detector backends and
//! the ordered fallback chain that queries them.

use image::RgbImage;
use tracing::{debug, warn};

use super::subject::{Subject, SubjectKind};
use super::CropConfig;
use crate::error::DetectionError;

/// A detector backend that finds subjects in an RGB frame.
///
/// Implementations report faults as [`DetectionError`]; the chain turns them
/// into "nothing found" so the next backend gets a chance.
pub trait SubjectDetector: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// What this backend detects. Faces are queried before people.
    fn kind(&self) -> SubjectKind;

    /// Detect subjects in `img`, coordinates in the pixels of `img`.
    fn detect(&self, img: &RgbImage) -> Result<Vec<Subject>, DetectionError>;
}

/// Result of running the chain over one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainDetection {
    pub subjects: Vec<Subject>,
    /// Name of the backend whose output was used.
    pub detector: Option<String>,
}

impl ChainDetection {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// Ordered list of detectors; the first one with a non-empty result wins.
pub struct DetectionChain {
    detectors: Vec<Box<dyn SubjectDetector>>,
    min_confidence: f32,
    size_threshold: f64,
}

impl DetectionChain {
    /// Build a chain, ordering face backends before person backends.
    ///
    /// Backends of the same kind keep the order they were given in.
    pub fn new(mut detectors: Vec<Box<dyn SubjectDetector>>, config: &CropConfig) -> Self {
        detectors.sort_by_key(|d| match d.kind() {
            SubjectKind::Face => 0,
            SubjectKind::Person => 1,
        });

        Self {
            detectors,
            min_confidence: config.min_detection_confidence,
            size_threshold: config.face_size_threshold as f64,
        }
    }

    /// A chain with no backends; every frame falls back to a center crop.
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
            min_confidence: 0.0,
            size_threshold: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn detector_names(&self) -> Vec<String> {
        self.detectors.iter().map(|d| d.name().to_string()).collect()
    }

    /// Query backends in order. Never fails: backend errors count as empty.
    pub fn detect(&self, img: &RgbImage) -> ChainDetection {
        for detector in &self.detectors {
            let raw = match detector.detect(img) {
                Ok(subjects) => subjects,
                Err(e) => {
                    warn!("{} detector failed, trying next: {}", detector.name(), e);
                    continue;
                }
            };

            let subjects = self.normalize(raw, detector.kind(), img.width(), img.height());
            debug!(
                "{} detector kept {} {} subjects",
                detector.name(),
                subjects.len(),
                detector.kind().label()
            );

            if !subjects.is_empty() {
                return ChainDetection {
                    subjects,
                    detector: Some(detector.name().to_string()),
                };
            }
        }

        ChainDetection::default()
    }

    /// Clip to the frame, stamp the backend's kind and drop weak, tiny or
    /// non-finite boxes.
    fn normalize(
        &self,
        raw: Vec<Subject>,
        kind: SubjectKind,
        width: u32,
        height: u32,
    ) -> Vec<Subject> {
        let image_area = width as f64 * height as f64;
        if image_area <= 0.0 {
            return Vec::new();
        }

        raw.into_iter()
            .filter(|s| s.confidence.is_finite() && s.confidence >= self.min_confidence)
            .filter_map(|s| s.clamped_to(width, height))
            .filter(|s| s.area() / image_area >= self.size_threshold)
            .map(|mut s| {
                s.kind = kind;
                s
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedDetector {
        name: &'static str,
        kind: SubjectKind,
        result: Result<Vec<Subject>, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedDetector {
        fn boxed(
            name: &'static str,
            kind: SubjectKind,
            result: Result<Vec<Subject>, &'static str>,
        ) -> (Box<dyn SubjectDetector>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let detector = FixedDetector {
                name,
                kind,
                result,
                calls: Arc::clone(&calls),
            };
            (Box::new(detector), calls)
        }
    }

    impl SubjectDetector for FixedDetector {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> SubjectKind {
            self.kind
        }

        fn detect(&self, _img: &RgbImage) -> Result<Vec<Subject>, DetectionError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match &self.result {
                Ok(subjects) => Ok(subjects.clone()),
                Err(msg) => Err(DetectionError::Inference(msg.to_string())),
            }
        }
    }

    fn test_image() -> RgbImage {
        ImageBuffer::from_pixel(1000, 1000, image::Rgb([128, 128, 128]))
    }

    #[test]
    fn test_face_detector_wins_when_it_finds_something() {
        let config = CropConfig::default();
        let (person, person_calls) = FixedDetector::boxed(
            "person",
            SubjectKind::Person,
            Ok(vec![Subject::person(0.0, 0.0, 300.0, 900.0, 0.9)]),
        );
        let (face, _) = FixedDetector::boxed(
            "face",
            SubjectKind::Face,
            Ok(vec![Subject::face(100.0, 100.0, 100.0, 100.0, 0.9)]),
        );

        // given person-first, the chain still asks the face backend first
        let chain = DetectionChain::new(vec![person, face], &config);
        let result = chain.detect(&test_image());

        assert_eq!(result.detector.as_deref(), Some("face"));
        assert_eq!(result.subjects.len(), 1);
        assert_eq!(person_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_falls_back_to_person_detector() {
        let config = CropConfig::default();
        let (face, _) = FixedDetector::boxed("face", SubjectKind::Face, Ok(Vec::new()));
        let (person, _) = FixedDetector::boxed(
            "person",
            SubjectKind::Person,
            Ok(vec![Subject::person(0.0, 0.0, 300.0, 900.0, 0.9)]),
        );

        let chain = DetectionChain::new(vec![face, person], &config);
        let result = chain.detect(&test_image());

        assert_eq!(result.detector.as_deref(), Some("person"));
        assert_eq!(result.subjects[0].kind, SubjectKind::Person);
    }

    #[test]
    fn test_detector_error_is_absorbed() {
        let config = CropConfig::default();
        let (face, face_calls) =
            FixedDetector::boxed("face", SubjectKind::Face, Err("model missing"));
        let (person, _) = FixedDetector::boxed(
            "person",
            SubjectKind::Person,
            Ok(vec![Subject::person(10.0, 10.0, 300.0, 900.0, 0.9)]),
        );

        let chain = DetectionChain::new(vec![face, person], &config);
        let result = chain.detect(&test_image());

        assert_eq!(face_calls.load(Ordering::Relaxed), 1);
        assert_eq!(result.detector.as_deref(), Some("person"));
    }

    #[test]
    fn test_all_empty_yields_no_subjects() {
        let config = CropConfig::default();
        let (face, _) = FixedDetector::boxed("face", SubjectKind::Face, Err("boom"));
        let (person, _) = FixedDetector::boxed("person", SubjectKind::Person, Ok(Vec::new()));

        let chain = DetectionChain::new(vec![face, person], &config);
        let result = chain.detect(&test_image());

        assert!(result.is_empty());
        assert!(result.detector.is_none());
        assert!(DetectionChain::empty().detect(&test_image()).is_empty());
    }

    #[test]
    fn test_filters_low_confidence_and_tiny_subjects() {
        let config = CropConfig {
            min_detection_confidence: 0.5,
            face_size_threshold: 0.01,
            ..CropConfig::default()
        };
        let (face, _) = FixedDetector::boxed(
            "face",
            SubjectKind::Face,
            Ok(vec![
                Subject::face(0.0, 0.0, 200.0, 200.0, 0.3),
                Subject::face(500.0, 500.0, 50.0, 50.0, 0.9),
                Subject::face(100.0, 600.0, 150.0, 150.0, 0.9),
                Subject::face(900.0, 900.0, 300.0, 300.0, 0.9),
            ]),
        );

        let chain = DetectionChain::new(vec![face], &config);
        let result = chain.detect(&test_image());

        // the last box is clipped to 100x100, exactly at the threshold
        assert_eq!(result.subjects.len(), 2);
        assert_eq!(result.subjects[0].y, 600.0);
        assert_eq!(result.subjects[1].width, 100.0);
        assert_eq!(result.subjects[1].bottom(), 1000.0);
    }

    #[test]
    fn test_filtered_out_results_fall_through() {
        let config = CropConfig {
            min_detection_confidence: 0.8,
            ..CropConfig::default()
        };
        let (face, _) = FixedDetector::boxed(
            "face",
            SubjectKind::Face,
            Ok(vec![Subject::face(0.0, 0.0, 200.0, 200.0, 0.4)]),
        );
        let (person, _) = FixedDetector::boxed(
            "person",
            SubjectKind::Person,
            Ok(vec![Subject::person(0.0, 0.0, 300.0, 900.0, 0.95)]),
        );

        let chain = DetectionChain::new(vec![face, person], &config);

        assert_eq!(chain.detect(&test_image()).detector.as_deref(), Some("person"));
    }

    #[test]
    fn test_non_finite_boxes_are_dropped() {
        let config = CropConfig::default();
        let (face, _) = FixedDetector::boxed(
            "face",
            SubjectKind::Face,
            Ok(vec![
                Subject::face(f64::NAN, f64::NAN, 200.0, 200.0, 0.9),
                Subject::face(100.0, 100.0, f64::INFINITY, 200.0, 0.9),
            ]),
        );
        let (person, _) = FixedDetector::boxed(
            "person",
            SubjectKind::Person,
            Ok(vec![Subject::person(400.0, 300.0, 200.0, 500.0, 0.9)]),
        );

        // only garbage boxes from the face backend, so the person backend wins
        let chain = DetectionChain::new(vec![face, person], &config);
        let result = chain.detect(&test_image());

        assert_eq!(result.detector.as_deref(), Some("person"));
        assert_eq!(result.subjects.len(), 1);
        assert!(result.subjects.iter().all(|s| s.y.is_finite() && s.height.is_finite()));
    }
}
