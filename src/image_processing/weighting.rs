use super::subject::{Orientation, Subject, SubjectKind};
use super::CropConfig;

/// Number of top-ranked subjects the crop solver must keep in frame.
pub const PRIMARY_SUBJECT_COUNT: usize = 3;

/// Portrait composition line, as a fraction of the image height from the top.
pub const COMPOSITION_TARGET_RATIO: f64 = 0.4;

/// Slope applied to subjects below the vertical midpoint of a portrait frame.
const BELOW_MIDPOINT_PENALTY: f64 = 2.0;

/// Inter-ocular distance expected for a frontal face, relative to face width.
const EXPECTED_EYE_SPAN_RATIO: f64 = 0.3;

const SIZE_WEIGHT_FACTOR: f64 = 2.0;
const COMPOSITION_WEIGHT_FACTOR: f64 = 1.5;
const QUALITY_WEIGHT_FACTOR: f64 = 0.5;

/// A subject annotated with its ranking score.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSubject {
    pub subject: Subject,
    pub weight: f64,
    pub quality: f64,
}

/// Subjects ordered by descending weight, plus the weighted vertical centroid
/// of all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRanking {
    pub subjects: Vec<WeightedSubject>,
    pub weighted_center_y: f64,
}

impl SubjectRanking {
    /// The subjects the solver must keep unclipped whenever it can.
    pub fn primary(&self) -> &[WeightedSubject] {
        let n = self.subjects.len().min(PRIMARY_SUBJECT_COUNT);
        &self.subjects[..n]
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// Score and rank subjects detected in a `width` x `height` frame.
///
/// Ties keep detection order. An empty input yields an empty ranking whose
/// centroid is the frame's vertical midpoint.
pub fn weigh_subjects(
    subjects: Vec<Subject>,
    width: u32,
    height: u32,
    orientation: Orientation,
    config: &CropConfig,
) -> SubjectRanking {
    let image_area = (width as f64 * height as f64).max(1.0);
    let image_height = (height as f64).max(1.0);

    let mut weighted: Vec<WeightedSubject> = subjects
        .into_iter()
        .map(|subject| {
            let (weight, quality) = match orientation {
                Orientation::Landscape => (landscape_weight(&subject, image_area, image_height), 1.0),
                Orientation::Portrait => {
                    let quality = face_quality(&subject);
                    (portrait_weight(&subject, image_area, image_height, quality, config), quality)
                }
            };
            WeightedSubject {
                subject,
                weight,
                quality,
            }
        })
        .collect();

    // sort_by is stable, so equal weights keep detection order
    weighted.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let weighted_center_y = weighted_centroid(&weighted).unwrap_or(image_height / 2.0);

    SubjectRanking {
        subjects: weighted,
        weighted_center_y,
    }
}

fn landscape_weight(subject: &Subject, image_area: f64, image_height: f64) -> f64 {
    let size_weight = subject.area() / image_area;
    let position_weight = 1.0 - (subject.center_y() - image_height / 2.0).abs() / image_height;
    size_weight * SIZE_WEIGHT_FACTOR + position_weight
}

fn portrait_weight(
    subject: &Subject,
    image_area: f64,
    image_height: f64,
    quality: f64,
    config: &CropConfig,
) -> f64 {
    let size_weight = subject.area() / image_area;
    let center_y = subject.center_y();

    let offset = (center_y - image_height / 2.0) / image_height;
    let position_weight = if offset <= 0.0 {
        config.portrait_upper_bias as f64 * (1.0 - offset.abs())
    } else {
        1.0 - offset * BELOW_MIDPOINT_PENALTY
    };

    let composition_target = image_height * COMPOSITION_TARGET_RATIO;
    let composition_weight = 1.0 - (center_y - composition_target).abs() / image_height;

    size_weight * SIZE_WEIGHT_FACTOR
        + position_weight * config.portrait_face_weight as f64
        + composition_weight * COMPOSITION_WEIGHT_FACTOR
        + quality * QUALITY_WEIGHT_FACTOR
}

/// Rough frontal-ness of a face from its eye span; 1.0 when unknown.
fn face_quality(subject: &Subject) -> f64 {
    match (subject.kind, &subject.landmarks) {
        (SubjectKind::Face, Some(landmarks)) if subject.width > 0.0 => {
            let expected = subject.width * EXPECTED_EYE_SPAN_RATIO;
            (landmarks.inter_ocular_distance() / expected).min(1.0)
        }
        _ => 1.0,
    }
}

fn weighted_centroid(subjects: &[WeightedSubject]) -> Option<f64> {
    if subjects.is_empty() {
        return None;
    }

    let total_weight: f64 = subjects.iter().map(|s| s.weight).sum();
    if total_weight > f64::EPSILON {
        let sum: f64 = subjects
            .iter()
            .map(|s| s.subject.center_y() * s.weight)
            .sum();
        Some(sum / total_weight)
    } else {
        let sum: f64 = subjects.iter().map(|s| s.subject.center_y()).sum();
        Some(sum / subjects.len() as f64)
    }
}
