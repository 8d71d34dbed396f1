//! Quality-aware encoders and the PNG to ICO container step.

use std::borrow::Cow;
use std::io::{Cursor, Seek, Write};

use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, ImageResult};

use crate::error::ProcessingError;
use crate::request::{OutputFormat, Quality};

/// Largest edge an ICO frame can have.
pub const ICO_SIZE: u32 = 256;

/// Format plus the quality actually handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    format: OutputFormat,
    quality: Quality,
}

impl EncodeSettings {
    pub fn new(format: OutputFormat, quality: Quality) -> Self {
        Self {
            format,
            quality: quality.for_format(format),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality.value()
    }

    /// PNG is lossless, so lower quality buys a harder compression pass.
    fn png_compression(&self) -> CompressionType {
        if self.quality() < 75 {
            CompressionType::Best
        } else {
            CompressionType::Default
        }
    }
}

fn write_with<E: ImageEncoder>(encoder: E, image: &DynamicImage) -> ImageResult<()> {
    encoder.write_image(
        image.as_bytes(),
        image.width(),
        image.height(),
        image.color().into(),
    )
}

/// 8-bit RGB or RGBA, keeping alpha when present.
fn eight_bit(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
        _ if image.color().has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}

/// Encode `image` into `writer` according to `settings`.
pub fn encode_to<W: Write + Seek>(
    image: &DynamicImage,
    settings: &EncodeSettings,
    writer: &mut W,
) -> Result<(), ProcessingError> {
    let encoded = match settings.format() {
        OutputFormat::Png => write_with(
            PngEncoder::new_with_quality(&mut *writer, settings.png_compression(), PngFilter::Adaptive),
            &eight_bit(image),
        ),
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            write_with(
                JpegEncoder::new_with_quality(&mut *writer, settings.quality()),
                &rgb,
            )
        }
        OutputFormat::Webp => {
            let lossy = encode_webp(image, settings.quality())?;
            writer.write_all(&lossy)?;
            return Ok(());
        }
        OutputFormat::Tiff => write_with(TiffEncoder::new(&mut *writer), &eight_bit(image)),
        OutputFormat::Ico => {
            let ico = png_to_ico(&encode_png(image)?)?;
            writer.write_all(&ico)?;
            return Ok(());
        }
    };
    encoded.map_err(ProcessingError::Encode)
}

/// Lossy WebP through libwebp at `quality` (1-100).
pub fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ProcessingError> {
    let source = eight_bit(image);
    let encoder = webp::Encoder::from_image(&source)
        .map_err(|reason| ProcessingError::WebpEncode(reason.to_string()))?;
    Ok(encoder.encode(f32::from(quality)).to_vec())
}

/// Encode to PNG in memory.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ProcessingError> {
    let mut buffer = Cursor::new(Vec::new());
    eight_bit(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(ProcessingError::Encode)?;
    Ok(buffer.into_inner())
}

/// Wrap an encoded PNG in a single-frame ICO container.
pub fn png_to_ico(png: &[u8]) -> Result<Vec<u8>, ProcessingError> {
    let (width, height) = ImageReader::with_format(Cursor::new(png), ImageFormat::Png)
        .into_dimensions()
        .map_err(ProcessingError::Decode)?;
    let frame = IcoFrame::with_encoded(png, width, height, ExtendedColorType::Rgba8)
        .map_err(ProcessingError::Encode)?;

    let mut output = Vec::new();
    IcoEncoder::new(&mut output)
        .encode_images(&[frame])
        .map_err(ProcessingError::Encode)?;
    Ok(output)
}
