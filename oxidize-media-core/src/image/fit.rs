//! Resize geometry for the fit strategies.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::request::Fit;

/// Fully transparent padding used by [`Fit::Contain`].
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// What to do to the decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Scale to exactly `width` x `height`.
    Scale { width: u32, height: u32 },
    /// Scale, then cut the centred `crop_width` x `crop_height` window.
    ScaleThenCrop {
        width: u32,
        height: u32,
        crop_width: u32,
        crop_height: u32,
    },
    /// Scale, then centre on a transparent canvas.
    ScaleOnCanvas {
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
}

impl Geometry {
    /// Dimensions of the image this geometry produces.
    pub fn output_dimensions(&self) -> (u32, u32) {
        match *self {
            Geometry::Scale { width, height } => (width, height),
            Geometry::ScaleThenCrop {
                crop_width,
                crop_height,
                ..
            } => (crop_width, crop_height),
            Geometry::ScaleOnCanvas {
                canvas_width,
                canvas_height,
                ..
            } => (canvas_width, canvas_height),
        }
    }
}

fn scaled(length: u32, factor: f64) -> u32 {
    ((length as f64) * factor).round().max(1.0) as u32
}

/// Work out the geometry for a resize, or `None` when no resize is needed.
///
/// With `without_enlargement` the target box is first clamped to the source
/// size, so no scale factor above 1 can come out of it.
pub fn plan(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    fit: Fit,
    without_enlargement: bool,
) -> Option<Geometry> {
    let (source_width, source_height) = source;
    if source_width == 0 || source_height == 0 {
        return None;
    }
    let clamp = |requested: u32, limit: u32| {
        if without_enlargement {
            requested.min(limit)
        } else {
            requested
        }
    };
    let sw = source_width as f64;
    let sh = source_height as f64;

    let geometry = match (width, height) {
        (None, None) => return None,
        (Some(width), None) => {
            let width = clamp(width, source_width);
            Geometry::Scale {
                width,
                height: scaled(source_height, width as f64 / sw),
            }
        }
        (None, Some(height)) => {
            let height = clamp(height, source_height);
            Geometry::Scale {
                width: scaled(source_width, height as f64 / sh),
                height,
            }
        }
        (Some(width), Some(height)) => {
            let box_width = clamp(width, source_width);
            let box_height = clamp(height, source_height);
            let x_factor = box_width as f64 / sw;
            let y_factor = box_height as f64 / sh;
            match fit {
                Fit::Fill => Geometry::Scale {
                    width: box_width,
                    height: box_height,
                },
                Fit::Inside => {
                    let factor = x_factor.min(y_factor);
                    Geometry::Scale {
                        width: scaled(source_width, factor),
                        height: scaled(source_height, factor),
                    }
                }
                Fit::Outside => {
                    let factor = x_factor.max(y_factor);
                    Geometry::Scale {
                        width: scaled(source_width, factor),
                        height: scaled(source_height, factor),
                    }
                }
                Fit::Cover => {
                    let factor = x_factor.max(y_factor);
                    let width = scaled(source_width, factor);
                    let height = scaled(source_height, factor);
                    Geometry::ScaleThenCrop {
                        width,
                        height,
                        crop_width: box_width.min(width),
                        crop_height: box_height.min(height),
                    }
                }
                Fit::Contain => {
                    let factor = x_factor.min(y_factor);
                    Geometry::ScaleOnCanvas {
                        width: scaled(source_width, factor).min(box_width),
                        height: scaled(source_height, factor).min(box_height),
                        canvas_width: box_width,
                        canvas_height: box_height,
                    }
                }
            }
        }
    };

    if geometry == (Geometry::Scale {
        width: source_width,
        height: source_height,
    }) {
        return None;
    }
    Some(geometry)
}

fn scale(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        image.resize_exact(width, height, FilterType::Lanczos3)
    }
}

/// Apply a planned geometry.
pub fn apply(image: &DynamicImage, geometry: Geometry) -> DynamicImage {
    match geometry {
        Geometry::Scale { width, height } => scale(image, width, height),
        Geometry::ScaleThenCrop {
            width,
            height,
            crop_width,
            crop_height,
        } => {
            let resized = scale(image, width, height);
            resized.crop_imm(
                (width - crop_width) / 2,
                (height - crop_height) / 2,
                crop_width,
                crop_height,
            )
        }
        Geometry::ScaleOnCanvas {
            width,
            height,
            canvas_width,
            canvas_height,
        } => {
            let resized = scale(image, width, height).to_rgba8();
            let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, TRANSPARENT);
            imageops::overlay(
                &mut canvas,
                &resized,
                ((canvas_width - width) / 2) as i64,
                ((canvas_height - height) / 2) as i64,
            );
            DynamicImage::ImageRgba8(canvas)
        }
    }
}
