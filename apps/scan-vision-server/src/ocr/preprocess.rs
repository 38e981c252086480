//! Image preprocessing for the detection and recognition models.
//!
//! Both models were trained on BGR input, so tensors are filled in BGR
//! channel order.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use super::types::{OcrError, OcrResult};

/// ImageNet mean, applied per tensor channel
const DET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet standard deviation, applied per tensor channel
const DET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Recognition input height
pub const REC_IMAGE_HEIGHT: u32 = 48;

/// Recognition inputs are padded to at least this width
pub const REC_MIN_WIDTH: u32 = 320;

/// Detection tensor plus the resize ratios needed to map boxes back
#[derive(Debug)]
pub struct DetectionInput {
    /// `[1, 3, H, W]`, H and W multiples of 32
    pub tensor: Array4<f32>,
    pub ratio_w: f32,
    pub ratio_h: f32,
}

/// Resize so the longest side fits `limit_side_len`, snap both sides to
/// multiples of 32, and normalize with ImageNet statistics.
pub fn detection_input(image: &RgbImage, limit_side_len: u32) -> OcrResult<DetectionInput> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidImage("Image has zero dimensions".to_string()));
    }

    let max_side = width.max(height);
    let ratio = if max_side > limit_side_len {
        limit_side_len as f32 / max_side as f32
    } else {
        1.0
    };

    let resize_w = snap_to_32(width as f32 * ratio);
    let resize_h = snap_to_32(height as f32 * ratio);
    let resized = imageops::resize(image, resize_w, resize_h, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, resize_h as usize, resize_w as usize));
    fill_bgr(&mut tensor, &resized, |channel, value| {
        (value / 255.0 - DET_MEAN[channel]) / DET_STD[channel]
    });

    Ok(DetectionInput {
        tensor,
        ratio_w: resize_w as f32 / width as f32,
        ratio_h: resize_h as f32 / height as f32,
    })
}

/// Resize a text crop to the recognition height, keeping aspect ratio, and
/// right-pad with zeros up to the batch width.
pub fn recognition_input(crop: &RgbImage) -> OcrResult<Array4<f32>> {
    let (width, height) = crop.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidImage("Crop has zero dimensions".to_string()));
    }

    let ratio = width as f32 / height as f32;
    let scaled_w = (REC_IMAGE_HEIGHT as f32 * ratio).ceil() as u32;
    let target_w = scaled_w.max(REC_MIN_WIDTH);
    let resized_w = scaled_w.clamp(1, target_w);

    let resized = imageops::resize(crop, resized_w, REC_IMAGE_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, REC_IMAGE_HEIGHT as usize, target_w as usize));
    fill_bgr(&mut tensor, &resized, |_, value| (value / 255.0 - 0.5) / 0.5);

    Ok(tensor)
}

/// Copy the `[x1, y1, x2, y2]` region out of the image
pub fn crop_region(image: &RgbImage, bbox: [u32; 4]) -> RgbImage {
    let [x1, y1, x2, y2] = bbox;
    imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image()
}

fn snap_to_32(value: f32) -> u32 {
    ((value / 32.0).round() as u32 * 32).max(32)
}

/// Write `image` into the top-left of `tensor` as B, G, R planes
fn fill_bgr<F>(tensor: &mut Array4<f32>, image: &RgbImage, normalize: F)
where
    F: Fn(usize, f32) -> f32,
{
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (x, y) = (x as usize, y as usize);
        for (channel, value) in [b, g, r].into_iter().enumerate() {
            tensor[[0, channel, y, x]] = normalize(channel, value as f32);
        }
    }
}
