//! Error Level Analysis.
//!
//! An image is re-encoded as JPEG at a fixed quality and decoded again. The
//! per-channel absolute difference between the original and the recompressed
//! copy is then stretched so that the largest difference maps to 255.
//! Regions that were pasted in or edited after the last save recompress
//! differently from their surroundings and stand out in the result.
//!
//! The recompressed copy lives in a call-local scratch buffer: either a
//! `Vec<u8>` or a uniquely named [`tempfile::NamedTempFile`]. Both are dropped
//! before [`ElaTransform::apply`] returns, including on error and unwind.

use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, ImageFormat, RgbImage};
use thiserror::Error;

use crate::config::{ElaConfig, ScratchMode};

/// Failures inside the transform. Mapped to `DetectError::Decode` by the
/// detector, which knows the filename.
#[derive(Debug, Error)]
pub enum ElaError {
    #[error("source image could not be decoded: {0}")]
    SourceDecode(#[source] ImageError),

    #[error("JPEG re-encode failed: {0}")]
    Encode(#[source] ImageError),

    #[error("recompressed copy could not be decoded: {0}")]
    RecompressedDecode(#[source] ImageError),

    #[error("scratch file error: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("recompressed copy is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("JPEG quality {0} outside 1..=100")]
    InvalidQuality(u8),
}

/// Decode arbitrary image bytes into a 3-channel bitmap.
///
/// The format is sniffed from the content, so the filename extension plays
/// no part.
pub fn decode_source(bytes: &[u8]) -> Result<RgbImage, ElaError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(ElaError::SourceDecode)
}

/// Scaled recompression error of a source image.
#[derive(Debug, Clone)]
pub struct ElaImage {
    image: RgbImage,
    max_diff: u8,
}

impl ElaImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Largest raw difference before scaling, after the zero substitution.
    pub fn max_diff(&self) -> u8 {
        self.max_diff
    }

    /// Brightness factor applied to the raw differences.
    pub fn scale(&self) -> f32 {
        255.0 / f32::from(self.max_diff)
    }

    /// Write the ELA image to disk; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        self.image.save(path)
    }
}

/// Per-pixel, per-channel absolute difference of two equally sized images.
pub fn error_levels(original: &RgbImage, compressed: &RgbImage) -> Result<RgbImage, ElaError> {
    if original.dimensions() != compressed.dimensions() {
        return Err(ElaError::DimensionMismatch {
            width: original.width(),
            height: original.height(),
            actual_width: compressed.width(),
            actual_height: compressed.height(),
        });
    }

    let mut diff = RgbImage::new(original.width(), original.height());
    for ((out, a), b) in diff
        .pixels_mut()
        .zip(original.pixels())
        .zip(compressed.pixels())
    {
        for c in 0..3 {
            out.0[c] = a.0[c].abs_diff(b.0[c]);
        }
    }
    Ok(diff)
}

/// Stretch raw differences so the largest one becomes 255.
///
/// A difference image that is entirely zero uses a max of 1, which leaves it
/// unchanged.
pub fn amplify(mut diff: RgbImage) -> ElaImage {
    let max_diff = diff.iter().copied().max().unwrap_or(0).max(1);
    let scale = 255.0 / f32::from(max_diff);

    for v in diff.iter_mut() {
        *v = (f32::from(*v) * scale).round().clamp(0.0, 255.0) as u8;
    }

    ElaImage {
        image: diff,
        max_diff,
    }
}

/// JPEG recompression ELA at a fixed quality.
#[derive(Debug, Clone)]
pub struct ElaTransform {
    quality: u8,
    scratch: ScratchMode,
    scratch_dir: Option<PathBuf>,
}

impl ElaTransform {
    /// In-memory transform at the given quality.
    pub fn new(quality: u8) -> Result<Self, ElaError> {
        if !(1..=100).contains(&quality) {
            return Err(ElaError::InvalidQuality(quality));
        }
        Ok(Self {
            quality,
            scratch: ScratchMode::Memory,
            scratch_dir: None,
        })
    }

    pub fn from_config(config: &ElaConfig) -> Result<Self, ElaError> {
        Ok(Self::new(config.quality)?.with_scratch(config.scratch, config.scratch_dir.clone()))
    }

    #[must_use]
    pub fn with_scratch(mut self, scratch: ScratchMode, scratch_dir: Option<PathBuf>) -> Self {
        self.scratch = scratch;
        self.scratch_dir = scratch_dir;
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn scratch(&self) -> ScratchMode {
        self.scratch
    }

    /// Run the full transform on a decoded source image.
    pub fn apply(&self, source: &RgbImage) -> Result<ElaImage, ElaError> {
        let compressed = self.recompress(source)?;
        let diff = error_levels(source, &compressed)?;
        let ela = amplify(diff);
        tracing::debug!(
            width = ela.width(),
            height = ela.height(),
            max_diff = ela.max_diff(),
            "ELA transform complete"
        );
        Ok(ela)
    }

    /// JPEG round trip of `source` at the configured quality.
    pub fn recompress(&self, source: &RgbImage) -> Result<RgbImage, ElaError> {
        match self.scratch {
            ScratchMode::Memory => self.recompress_in_memory(source),
            ScratchMode::Disk => self.recompress_on_disk(source),
        }
    }

    fn recompress_in_memory(&self, source: &RgbImage) -> Result<RgbImage, ElaError> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode_image(source)
            .map_err(ElaError::Encode)?;

        image::load_from_memory_with_format(&buffer, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(ElaError::RecompressedDecode)
    }

    fn recompress_on_disk(&self, source: &RgbImage) -> Result<RgbImage, ElaError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ela-").suffix(".jpg");
        // Removed when `scratch` drops, whichever way this function exits.
        let mut scratch = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        {
            let mut writer = BufWriter::new(scratch.as_file_mut());
            JpegEncoder::new_with_quality(&mut writer, self.quality)
                .encode_image(source)
                .map_err(ElaError::Encode)?;
            writer.flush()?;
        }

        scratch.as_file_mut().seek(SeekFrom::Start(0))?;
        let reader = BufReader::new(scratch.as_file());
        image::load(reader, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(ElaError::RecompressedDecode)
    }
}
