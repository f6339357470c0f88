use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::GrayImage;
use image::imageops::{self, FilterType};
use ndarray::Array2;

use super::PredictorError;

/// Decodes a base64 PNG mask into a `height x width` array of 0 / 255.
///
/// Any nonzero pixel is foreground, so both 0/1 and 0/255 masks decode.
///
/// Masks whose size differs from the target are resized with nearest-neighbour
/// sampling so region edges stay hard.
pub fn decode_png_mask(encoded: &str, width: u32, height: u32) -> Result<Array2<u8>, PredictorError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let mut gray: GrayImage = image::load_from_memory(&bytes)?.to_luma8();
    if gray.dimensions() != (width, height) {
        gray = imageops::resize(&gray, width, height, FilterType::Nearest);
    }
    binarize(gray)
}

fn binarize(gray: GrayImage) -> Result<Array2<u8>, PredictorError> {
    let (width, height) = gray.dimensions();
    let pixels = gray
        .into_raw()
        .into_iter()
        .map(|v| if v > 0 { 255 } else { 0 })
        .collect();
    Array2::from_shape_vec((height as usize, width as usize), pixels)
        .map_err(|e| PredictorError::Shape(e.to_string()))
}

#[cfg(test)]
pub(crate) fn encode_png_mask(mask: &Array2<u8>) -> String {
    use std::io::Cursor;

    let (height, width) = mask.dim();
    let gray = GrayImage::from_raw(width as u32, height as u32, mask.iter().copied().collect()).unwrap();
    let mut bytes = Cursor::new(Vec::new());
    gray.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    STANDARD.encode(bytes.into_inner())
}
