//! Classifier input preparation: resize the ELA image and scale to [0, 1].

use candle_core::{Device, Tensor};
use image::imageops;
use image::RgbImage;
use thiserror::Error;

use crate::config::{PreprocessConfig, ResizeFilter};

/// Channels per pixel in the classifier input.
pub const CHANNELS: usize = 3;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot resize an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },

    #[error("expected {expected} pixel values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("pixel value {value} at index {index} outside [0, 1]")]
    OutOfRange { index: usize, value: f32 },
}

/// Batched channel-last input tensor, shape `[1, height, width, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
    height: usize,
    width: usize,
}

impl NormalizedTensor {
    /// Wrap raw values laid out as `[1, height, width, 3]`.
    pub fn from_vec(data: Vec<f32>, height: usize, width: usize) -> Result<Self, PreprocessError> {
        let expected = height * width * CHANNELS;
        if data.len() != expected {
            return Err(PreprocessError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        if let Some((index, &value)) = data
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(PreprocessError::OutOfRange { index, value });
        }
        Ok(Self {
            data,
            height,
            width,
        })
    }

    /// Scale every channel of `image` by 1/255.
    pub fn from_rgb(image: &RgbImage) -> Result<Self, PreprocessError> {
        let data = image.iter().map(|&v| f32::from(v) / 255.0).collect();
        Self::from_vec(data, image.height() as usize, image.width() as usize)
    }

    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, CHANNELS]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Smallest and largest value, `None` for an empty tensor.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Copy into a candle tensor on `device`, keeping the NHWC layout.
    pub fn to_tensor(&self, device: &Device) -> candle_core::Result<Tensor> {
        Tensor::from_slice(&self.data, self.shape().to_vec(), device)
    }
}

/// Fixed resize + normalize step shared by every classification.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    target_size: u32,
    filter: ResizeFilter,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }
}

impl Preprocessor {
    pub fn new(target_size: u32, filter: ResizeFilter) -> Self {
        Self {
            target_size,
            filter,
        }
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self::new(config.target_size, config.filter)
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    pub fn filter(&self) -> ResizeFilter {
        self.filter
    }

    /// Resample to exactly `target_size` x `target_size`, ignoring aspect ratio.
    pub fn resize(&self, image: &RgbImage) -> Result<RgbImage, PreprocessError> {
        if image.width() == 0 || image.height() == 0 || self.target_size == 0 {
            return Err(PreprocessError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(imageops::resize(
            image,
            self.target_size,
            self.target_size,
            self.filter.into(),
        ))
    }

    pub fn normalize(&self, resized: &RgbImage) -> Result<NormalizedTensor, PreprocessError> {
        let size = self.target_size as usize;
        let tensor = NormalizedTensor::from_rgb(resized)?;
        if tensor.shape() != [1, size, size, CHANNELS] {
            return Err(PreprocessError::ShapeMismatch {
                expected: size * size * CHANNELS,
                actual: tensor.as_slice().len(),
            });
        }
        Ok(tensor)
    }
}
