//! Image decoding and normalisation for the lesion classifier.

use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayView4};
use service_core::error::AppError;
use thiserror::Error;

/// Edge length of the square classifier input.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Uploaded file is not a valid image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Uploaded image has no pixels ({width}x{height})")]
    ZeroSized { width: u32, height: u32 },
}

impl From<PreprocessError> for AppError {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::Decode(_) => {
                tracing::debug!(error = %err, "Image decode failed");
                AppError::BadRequest(anyhow::anyhow!("Uploaded file is not a valid image"))
            }
            other => AppError::BadRequest(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// NHWC `f32` tensor with a batch of one, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array4<f32>);

impl ImageTensor {
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }
}

impl From<Array4<f32>> for ImageTensor {
    fn from(array: Array4<f32>) -> Self {
        Self(array)
    }
}

/// Decode `bytes` (any format the `image` crate understands), convert to RGB,
/// resize to `size`x`size` with bicubic sampling and scale to `[0, 1]`.
pub fn preprocess_image(bytes: &[u8], size: u32) -> Result<ImageTensor, PreprocessError> {
    if bytes.is_empty() {
        return Err(PreprocessError::Empty);
    }

    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(PreprocessError::ZeroSized { width, height });
    }

    let rgb = decoded.to_rgb8();
    let resized = imageops::resize(&rgb, size, size, FilterType::CatmullRom);

    let side = size as usize;
    let tensor = Array4::<f32>::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
        let pixel = resized.get_pixel(x as u32, y as u32);
        f32::from(pixel[c]) / 255.0
    });

    Ok(ImageTensor(tensor))
}
