/// ONNX-based people detection with a YOLO11 model
use image::RgbImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

use super::subject::{Subject, SubjectKind};
use super::subject_detection::SubjectDetector;
use crate::error::DetectionError;

const INPUT_SIZE: u32 = 640;
const IOU_THRESHOLD: f32 = 0.4;
/// Class scores below this never become candidates; the chain applies the
/// configured confidence afterwards.
const CANDIDATE_THRESHOLD: f32 = 0.25;
/// COCO class id for "person".
const PERSON_CLASS_ID: usize = 0;

/// Raw detection in model input coordinates (center format)
#[derive(Debug, Clone)]
struct Detection {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    confidence: f32,
    class_id: usize,
}

/// YOLO person detector running on ONNX Runtime
pub struct YoloPersonDetector {
    session: Mutex<Session>,
}

impl YoloPersonDetector {
    /// Load a YOLO11 ONNX export (e.g. `yolo11n.onnx`)
    pub fn from_model_file(path: &Path) -> Result<Self, DetectionError> {
        let load_error = |e: ort::Error| DetectionError::ModelLoad(format!("{}: {}", path.display(), e));

        let session = Session::builder()
            .map_err(load_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_error)?
            .with_intra_threads(1)
            .map_err(load_error)?
            .commit_from_file(path)
            .map_err(load_error)?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl SubjectDetector for YoloPersonDetector {
    fn name(&self) -> &str {
        "yolo11"
    }

    fn kind(&self) -> SubjectKind {
        SubjectKind::Person
    }

    fn detect(&self, img: &RgbImage) -> Result<Vec<Subject>, DetectionError> {
        let inference = |e: ort::Error| DetectionError::Inference(e.to_string());

        // Prepare image for YOLO (resize to 640x640)
        let resized = image::imageops::resize(
            img,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::CatmullRom,
        );
        let tensor_data = prepare_tensor(&resized);

        let input_shape = vec![1usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
        let input_value = Value::from_array((input_shape, tensor_data)).map_err(inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs!["images" => input_value])
            .map_err(inference)?;

        let (output_shape, output_data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .map_err(inference)?;
        let shape: Vec<usize> = output_shape.iter().map(|&x| x as usize).collect();

        let detections = process_yolo_output(output_data, &shape, CANDIDATE_THRESHOLD, IOU_THRESHOLD)?;

        // Scale back to original image size
        let (width, height) = img.dimensions();
        let scale_x = width as f32 / INPUT_SIZE as f32;
        let scale_y = height as f32 / INPUT_SIZE as f32;

        Ok(detections
            .into_iter()
            .filter(|d| d.class_id == PERSON_CLASS_ID)
            .map(|d| {
                Subject::person(
                    ((d.x - d.width / 2.0) * scale_x) as f64,
                    ((d.y - d.height / 2.0) * scale_y) as f64,
                    (d.width * scale_x) as f64,
                    (d.height * scale_y) as f64,
                    d.confidence,
                )
            })
            .collect())
    }
}

/// Prepare NCHW tensor data from a 640x640 image
fn prepare_tensor(img: &RgbImage) -> Vec<f32> {
    let side = INPUT_SIZE as usize;
    let mut tensor_data = Vec::with_capacity(3 * side * side);

    for c in 0..3 {
        for y in 0..INPUT_SIZE {
            for x in 0..INPUT_SIZE {
                let pixel = img.get_pixel(x, y);
                tensor_data.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    tensor_data
}

/// Process YOLO output tensor and extract detections
///
/// YOLO11 output shape: [1, 4 + classes, predictions], stored feature-major.
fn process_yolo_output(
    output_data: &[f32],
    shape: &[usize],
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<Detection>, DetectionError> {
    let (batch_size, features, predictions) = match shape {
        [b, f, p] => (*b, *f, *p),
        _ => {
            return Err(DetectionError::MalformedOutput(format!(
                "expected 3D output, got shape {:?}",
                shape
            )))
        }
    };

    if batch_size != 1 || features <= 4 || output_data.len() < features * predictions {
        return Err(DetectionError::MalformedOutput(format!(
            "unexpected output shape {:?} for {} values",
            shape,
            output_data.len()
        )));
    }

    let mut detections = Vec::new();

    for i in 0..predictions {
        let at = |j: usize| output_data[j * predictions + i];

        // Find the class with maximum score
        let (class_id, confidence) = (4..features)
            .map(|j| (j - 4, at(j)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if confidence > confidence_threshold {
            detections.push(Detection {
                x: at(0),
                y: at(1),
                width: at(2),
                height: at(3),
                confidence,
                class_id,
            });
        }
    }

    Ok(non_maximum_suppression(detections, iou_threshold))
}

/// Non-Maximum Suppression to remove overlapping boxes
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();

    for det in detections {
        let overlaps = keep
            .iter()
            .any(|k| k.class_id == det.class_id && calculate_iou(k, &det) >= iou_threshold);
        if !overlaps {
            keep.push(det);
        }
    }

    keep
}

/// Calculate Intersection over Union (IoU) between two center-format boxes
fn calculate_iou(box1: &Detection, box2: &Detection) -> f32 {
    let inter_x1 = (box1.x - box1.width / 2.0).max(box2.x - box2.width / 2.0);
    let inter_y1 = (box1.y - box1.height / 2.0).max(box2.y - box2.height / 2.0);
    let inter_x2 = (box1.x + box1.width / 2.0).min(box2.x + box2.width / 2.0);
    let inter_y2 = (box1.y + box1.height / 2.0).min(box2.y + box2.height / 2.0);

    if inter_x2 < inter_x1 || inter_y2 < inter_y1 {
        return 0.0;
    }

    let inter_area = (inter_x2 - inter_x1) * (inter_y2 - inter_y1);
    let union_area = box1.width * box1.height + box2.width * box2.height - inter_area;

    if union_area <= 0.0 {
        0.0
    } else {
        inter_area / union_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, size: f32, confidence: f32, class_id: usize) -> Detection {
        Detection {
            x,
            y,
            width: size,
            height: size,
            confidence,
            class_id,
        }
    }

    #[test]
    fn test_iou() {
        let a = det(50.0, 50.0, 100.0, 0.9, 0);
        assert!((calculate_iou(&a, &a) - 1.0).abs() < 1e-6);

        let far = det(500.0, 500.0, 100.0, 0.9, 0);
        assert_eq!(calculate_iou(&a, &far), 0.0);
    }

    #[test]
    fn test_nms_keeps_best_of_overlapping() {
        let kept = non_maximum_suppression(
            vec![
                det(50.0, 50.0, 100.0, 0.6, 0),
                det(52.0, 52.0, 100.0, 0.9, 0),
                det(400.0, 400.0, 100.0, 0.7, 0),
                det(50.0, 50.0, 100.0, 0.5, 3),
            ],
            0.4,
        );

        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_process_output_picks_best_class() {
        // 2 predictions, 4 box values + 2 classes, feature-major
        let features = 6;
        let predictions = 2;
        let mut data = vec![0.0f32; features * predictions];
        let mut set = |f: usize, p: usize, v: f32| data[f * predictions + p] = v;
        set(0, 0, 320.0);
        set(1, 0, 320.0);
        set(2, 0, 100.0);
        set(3, 0, 300.0);
        set(4, 0, 0.8);
        set(5, 0, 0.1);
        set(4, 1, 0.1);
        set(5, 1, 0.2);

        let dets = process_yolo_output(&data, &[1, features, predictions], 0.25, 0.4).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[0].height, 300.0);
    }

    #[test]
    fn test_process_output_rejects_bad_shape() {
        let result = process_yolo_output(&[0.0; 10], &[1, 10], 0.25, 0.4);
        assert!(matches!(result, Err(DetectionError::MalformedOutput(_))));
    }
}
