use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::{imageops, ImageBuffer, RgbImage};
use std::num::NonZeroU32;

use super::crop_window::CropWindow;
use crate::error::TransformError;

/// Height of an image of `width` x `height` once scaled to `target_width`,
/// rounded toward zero.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    (target_width as u64 * height as u64 / width as u64) as u32
}

/// Scale an image so its width equals `target_width`, preserving aspect ratio.
pub fn resize_to_width(img: &RgbImage, target_width: u32) -> Result<RgbImage, TransformError> {
    let (src_width, src_height) = img.dimensions();
    let new_height = scaled_height(src_width, src_height, target_width);

    if target_width == 0 || new_height == 0 {
        return Err(TransformError::ZeroDimensions {
            width: target_width,
            height: new_height,
        });
    }

    resize_image(img, target_width, new_height)
}

/// Keep the rows of `window` across the full width.
pub fn crop_rows(img: &RgbImage, window: CropWindow) -> Result<RgbImage, TransformError> {
    let (width, height) = img.dimensions();

    if window.y_max > height || window.y_min >= window.y_max {
        return Err(TransformError::CropOutOfBounds {
            y_min: window.y_min,
            y_max: window.y_max,
            height,
        });
    }

    if window.y_min == 0 && window.y_max == height {
        return Ok(img.clone());
    }

    Ok(imageops::crop_imm(img, 0, window.y_min, width, window.height()).to_image())
}

/// Resize an image to exact dimensions using high-quality algorithm
fn resize_image(img: &RgbImage, width: u32, height: u32) -> Result<RgbImage, TransformError> {
    let (src_width, src_height) = img.dimensions();

    if src_width == width && src_height == height {
        return Ok(img.clone());
    }

    let zero = || TransformError::ZeroDimensions {
        width: src_width,
        height: src_height,
    };
    let src_width_nz = NonZeroU32::new(src_width).ok_or_else(zero)?;
    let src_height_nz = NonZeroU32::new(src_height).ok_or_else(zero)?;

    let src_image = Image::from_vec_u8(
        src_width_nz.get(),
        src_height_nz.get(),
        img.as_raw().clone(),
        PixelType::U8x3,
    )
    .map_err(|e| TransformError::Resize(e.to_string()))?;

    let mut dst_image = Image::new(width, height, PixelType::U8x3);

    let mut resizer = Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, Some(&ResizeOptions::default()))
        .map_err(|e| TransformError::Resize(e.to_string()))?;

    ImageBuffer::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| TransformError::Resize("resized buffer has unexpected size".to_string()))
}
