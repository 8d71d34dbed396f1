//! Image transformation pipeline.
//!
//! Every entry point decodes the upload, applies at most one geometric step,
//! encodes with [`EncodeSettings`], and materializes the encoded bytes through
//! a [`TempHandle`](crate::temp::TempHandle) that is released before returning.

pub mod encode;
pub mod fit;

use std::io::{BufWriter, Write};

use image::{DynamicImage, GenericImageView};
use tracing::{debug, instrument};

use crate::error::{ProcessingError, Result, TransformError};
use crate::request::{CropRegion, Fit, OutputFormat, Quality, TransformResult};
use crate::temp::TempStore;

pub use encode::{encode_png, encode_to, png_to_ico, EncodeSettings, ICO_SIZE};
pub use fit::Geometry;

/// Quality used for outputs whose endpoint takes no quality parameter.
const DEFAULT_PNG_QUALITY: i64 = 90;

/// Runs image plans against the codec, staging output in a [`TempStore`].
pub struct ImagePipeline<'a> {
    temp: &'a TempStore,
}

impl<'a> ImagePipeline<'a> {
    pub fn new(temp: &'a TempStore) -> Self {
        Self { temp }
    }

    /// Decode the upload. Corrupt or unsupported input is a processing error.
    pub fn decode(data: &[u8]) -> Result<DynamicImage> {
        let image = image::load_from_memory(data).map_err(ProcessingError::Decode)?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded"
        );
        Ok(image)
    }

    /// Re-encode without changing dimensions.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn compress(
        &self,
        data: &[u8],
        format: OutputFormat,
        quality: Quality,
    ) -> Result<TransformResult> {
        if format == OutputFormat::Ico {
            return self.ico(data);
        }
        let image = Self::decode(data)?;
        self.materialize(&image, EncodeSettings::new(format, quality))
    }

    /// Resize with `without_enlargement` semantics, then encode.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn resize(
        &self,
        data: &[u8],
        width: Option<u32>,
        height: Option<u32>,
        fit: Fit,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<TransformResult> {
        let image = Self::decode(data)?;
        let image = match fit::plan(image.dimensions(), width, height, fit, true) {
            Some(geometry) => {
                debug!(?geometry, "Resizing");
                fit::apply(&image, geometry)
            }
            None => image,
        };
        self.materialize(&image, EncodeSettings::new(format, quality))
    }

    /// Extract an exact rectangle and encode it as PNG.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn crop(&self, data: &[u8], region: CropRegion) -> Result<TransformResult> {
        let image = Self::decode(data)?;
        let (image_width, image_height) = image.dimensions();
        let right = region.left as u64 + region.width as u64;
        let bottom = region.top as u64 + region.height as u64;
        if right > image_width as u64 || bottom > image_height as u64 {
            return Err(ProcessingError::CropOutOfBounds {
                left: region.left,
                top: region.top,
                width: region.width,
                height: region.height,
                image_width,
                image_height,
            }
            .into());
        }

        let cropped = image.crop_imm(region.left, region.top, region.width, region.height);
        self.materialize(
            &cropped,
            EncodeSettings::new(OutputFormat::Png, Quality::clamped(DEFAULT_PNG_QUALITY)),
        )
    }

    /// Render a 256x256 transparent-padded canvas and wrap it as ICO.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn ico(&self, data: &[u8]) -> Result<TransformResult> {
        let image = Self::decode(data)?;
        let canvas = match fit::plan(
            image.dimensions(),
            Some(ICO_SIZE),
            Some(ICO_SIZE),
            Fit::Contain,
            false,
        ) {
            Some(geometry) => fit::apply(&image, geometry),
            // Zero-sized source, nothing to scale.
            None => DynamicImage::ImageRgba8(image.to_rgba8()),
        };
        self.materialize(
            &canvas,
            EncodeSettings::new(OutputFormat::Ico, Quality::clamped(DEFAULT_PNG_QUALITY)),
        )
    }

    /// Encode into a staged temp file and read the bytes back. The handle is
    /// released on success and on every error path.
    fn materialize(
        &self,
        image: &DynamicImage,
        settings: EncodeSettings,
    ) -> Result<TransformResult> {
        let format = settings.format();
        let data = self
            .temp
            .stage(format.extension(), |handle| -> Result<Vec<u8>> {
                {
                    let mut writer = BufWriter::new(handle.file_mut()?);
                    encode_to(image, &settings, &mut writer)?;
                    writer.flush().map_err(TransformError::from)?;
                }
                Ok(handle.read_to_vec()?)
            })?;
        debug!(format = %format, bytes = data.len(), "Image encoded");
        Ok(TransformResult::image(data, format))
    }
}
