use anyhow::{Context, Result};
use exif::{In, Reader, Tag, Value};
use image::{imageops, RgbImage};
use std::path::Path;
use tracing::debug;

/// EXIF orientation values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifOrientation {
    /// Tag missing or out of range
    Undefined = 0,
    /// Normal orientation (0 degrees)
    TopLeft = 1,
    /// Horizontally flipped
    TopRight = 2,
    /// Rotated 180 degrees
    BottomRight = 3,
    /// Vertically flipped
    BottomLeft = 4,
    /// Mirrored across the main diagonal (rotated 90 degrees CW + horizontally flipped)
    LeftTop = 5,
    /// Rotated 90 degrees CW
    RightTop = 6,
    /// Mirrored across the anti-diagonal (rotated 90 degrees CCW + horizontally flipped)
    RightBottom = 7,
    /// Rotated 90 degrees CCW
    LeftBottom = 8,
}

impl From<u32> for ExifOrientation {
    fn from(value: u32) -> Self {
        match value {
            1 => ExifOrientation::TopLeft,
            2 => ExifOrientation::TopRight,
            3 => ExifOrientation::BottomRight,
            4 => ExifOrientation::BottomLeft,
            5 => ExifOrientation::LeftTop,
            6 => ExifOrientation::RightTop,
            7 => ExifOrientation::RightBottom,
            8 => ExifOrientation::LeftBottom,
            _ => ExifOrientation::Undefined,
        }
    }
}

impl ExifOrientation {
    /// Whether restoring this orientation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(
            self,
            ExifOrientation::LeftTop
                | ExifOrientation::RightTop
                | ExifOrientation::RightBottom
                | ExifOrientation::LeftBottom
        )
    }
}

/// Load an image file and turn it upright according to its EXIF orientation.
///
/// Files without EXIF data (or with unreadable EXIF) are used as stored.
pub fn load_upright(image_path: &Path) -> Result<RgbImage> {
    let img = image::open(image_path)
        .with_context(|| format!("Failed to open image: {}", image_path.display()))?
        .to_rgb8();

    let orientation = read_exif_orientation(image_path).unwrap_or(ExifOrientation::Undefined);
    if orientation.swaps_dimensions() {
        debug!(
            "{}: EXIF {:?}, stored {}x{} becomes {}x{}",
            image_path.display(),
            orientation,
            img.width(),
            img.height(),
            img.height(),
            img.width()
        );
    }

    Ok(apply_rotation(&img, orientation))
}

/// Read EXIF orientation tag from an image file
fn read_exif_orientation(image_path: &Path) -> Result<ExifOrientation> {
    let file = std::fs::File::open(image_path).with_context(|| {
        format!(
            "Failed to open image for EXIF reading: {}",
            image_path.display()
        )
    })?;

    let mut buf_reader = std::io::BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf_reader)
        .context("Failed to read EXIF data")?;

    if let Some(field) = exif.get_field(Tag::Orientation, In::PRIMARY) {
        if let Value::Short(values) = &field.value {
            if let Some(&orientation_value) = values.first() {
                return Ok(ExifOrientation::from(orientation_value as u32));
            }
        }
    }

    Ok(ExifOrientation::Undefined)
}

/// Apply EXIF rotation to an image, handling all 8 orientations
pub fn apply_rotation(img: &RgbImage, orientation: ExifOrientation) -> RgbImage {
    match orientation {
        ExifOrientation::Undefined | ExifOrientation::TopLeft => img.clone(),
        ExifOrientation::TopRight => imageops::flip_horizontal(img),
        ExifOrientation::BottomRight => imageops::rotate180(img),
        ExifOrientation::BottomLeft => imageops::flip_vertical(img),
        ExifOrientation::LeftTop => imageops::flip_horizontal(&imageops::rotate90(img)),
        ExifOrientation::RightTop => imageops::rotate90(img),
        ExifOrientation::RightBottom => imageops::flip_horizontal(&imageops::rotate270(img)),
        ExifOrientation::LeftBottom => imageops::rotate270(img),
    }
}
