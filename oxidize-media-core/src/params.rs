//! Parameter validation.
//!
//! Turns raw, caller-controlled strings (query parameters and form fields)
//! into the typed values carried by [`TransformRequest`]. Nothing numeric or
//! enum-like reaches a codec without passing through one of these functions.

use crate::error::{Result, TransformError};
use crate::request::{
    CropRegion, Fit, OutputFormat, PageSelection, Quality, RotationAngle, TransformRequest,
    UploadedFile,
};

/// Format used when the caller does not ask for one.
pub const DEFAULT_FORMAT: &str = "png";

/// Largest width or height accepted for a resize.
pub const DEFAULT_MAX_DIMENSION: u32 = 10_000;

/// Accepted formats and default quality for one image operation.
#[derive(Debug, Clone, Copy)]
pub struct ImageOperationProfile {
    pub formats: &'static [&'static str],
    pub default_quality: i64,
}

pub const COMPRESS: ImageOperationProfile = ImageOperationProfile {
    formats: &["png", "jpg", "jpeg", "webp", "tiff", "ico"],
    default_quality: 80,
};

pub const CONVERT: ImageOperationProfile = ImageOperationProfile {
    formats: &["png", "jpg", "webp", "tiff", "ico"],
    default_quality: 90,
};

pub const RESIZE: ImageOperationProfile = ImageOperationProfile {
    formats: &["png", "jpg", "jpeg", "webp", "tiff"],
    default_quality: 90,
};

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse the leading integer of `raw`, ignoring trailing garbage
/// (`"85abc"` is 85). Values beyond `i64` saturate.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let digits = &rest[..digits_len];
    let signed = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    Some(signed.parse::<i64>().unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

/// Resolve the output format against an operation's supported set.
pub fn parse_format(raw: Option<&str>, supported: &[&str]) -> Result<OutputFormat> {
    let name = non_empty(raw)
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
    if !supported.contains(&name.as_str()) {
        return Err(TransformError::UnsupportedFormat(name));
    }
    OutputFormat::from_name(&name).ok_or(TransformError::UnsupportedFormat(name))
}

/// Quality clamped to `[1, 100]`; `default` when absent or unparsable.
pub fn parse_quality(raw: Option<&str>, default: i64) -> Quality {
    non_empty(raw)
        .and_then(parse_leading_int)
        .map(Quality::clamped)
        .unwrap_or_else(|| Quality::clamped(default))
}

/// Optional resize dimension. Absent means "derive from the other side".
pub fn parse_dimension(raw: Option<&str>, name: &str, max: u32) -> Result<Option<u32>> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    let value = parse_leading_int(raw)
        .ok_or_else(|| TransformError::InvalidParameters(format!("{name} must be an integer")))?;
    if value <= 0 {
        return Err(TransformError::InvalidParameters(format!(
            "{name} must be greater than zero"
        )));
    }
    if value > max as i64 {
        return Err(TransformError::InvalidParameters(format!(
            "{name} must not exceed {max}"
        )));
    }
    Ok(Some(value as u32))
}

pub fn parse_fit(raw: Option<&str>) -> Result<Fit> {
    match non_empty(raw) {
        None => Ok(Fit::default()),
        Some(name) => Fit::from_name(&name.to_ascii_lowercase())
            .ok_or_else(|| TransformError::InvalidParameters(format!("unknown fit: {name}"))),
    }
}

fn parse_offset(raw: Option<&str>, name: &str) -> Result<u32> {
    let Some(raw) = non_empty(raw) else {
        return Ok(0);
    };
    match parse_leading_int(raw) {
        Some(value) if (0..=u32::MAX as i64).contains(&value) => Ok(value as u32),
        _ => Err(TransformError::InvalidParameters(format!(
            "{name} must be a non-negative integer"
        ))),
    }
}

fn parse_extent(raw: Option<&str>, name: &str) -> Result<u32> {
    let raw = non_empty(raw)
        .ok_or_else(|| TransformError::InvalidParameters(format!("{name} is required")))?;
    match parse_leading_int(raw) {
        Some(value) if (1..=u32::MAX as i64).contains(&value) => Ok(value as u32),
        _ => Err(TransformError::InvalidParameters(format!(
            "{name} must be greater than zero"
        ))),
    }
}

/// Crop rectangle. Bounds against the image are checked after decode.
pub fn parse_crop(
    left: Option<&str>,
    top: Option<&str>,
    width: Option<&str>,
    height: Option<&str>,
) -> Result<CropRegion> {
    Ok(CropRegion {
        left: parse_offset(left, "left")?,
        top: parse_offset(top, "top")?,
        width: parse_extent(width, "width")?,
        height: parse_extent(height, "height")?,
    })
}

pub fn parse_angle(raw: Option<&str>) -> Result<RotationAngle> {
    let raw = non_empty(raw).unwrap_or_default();
    raw.parse::<f64>()
        .ok()
        .filter(|degrees| degrees.fract() == 0.0)
        .and_then(|degrees| RotationAngle::from_degrees(degrees as i64))
        .ok_or_else(|| TransformError::InvalidAngle(raw.to_string()))
}

fn parse_page_list(raw: &str, name: &str) -> Result<Vec<i64>> {
    serde_json::from_str::<Vec<i64>>(raw.trim()).map_err(|_| {
        TransformError::InvalidParameters(format!("{name} must be a JSON array of integers"))
    })
}

/// 1-based page numbers to extract. Must select at least one page; numbers
/// outside the document are skipped later.
pub fn parse_split_pages(raw: &str) -> Result<PageSelection> {
    let numbers = parse_page_list(raw, "pages")?;
    if numbers.is_empty() {
        return Err(TransformError::NoPagesSelected);
    }
    Ok(PageSelection::from_page_numbers(&numbers))
}

/// 1-based page sequence for a reorder. Range is checked by the pipeline.
pub fn parse_reorder(raw: &str) -> Result<PageSelection> {
    let numbers = parse_page_list(raw, "order")?;
    Ok(PageSelection::from_page_numbers(&numbers))
}

/// A required upload must be present and non-empty.
pub fn require_file(file: Option<UploadedFile>, field: &str) -> Result<UploadedFile> {
    match file {
        Some(file) if !file.is_empty() => Ok(file),
        _ => Err(TransformError::MissingField(field.to_string())),
    }
}

/// A required text field must be present and non-blank.
pub fn require_text<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    non_empty(value).ok_or_else(|| TransformError::MissingField(field.to_string()))
}

/// Compress or convert, depending on `profile`. `ico` becomes an
/// [`TransformRequest::IcoConvert`].
pub fn image_request(
    profile: &ImageOperationProfile,
    file: UploadedFile,
    format: Option<&str>,
    quality: Option<&str>,
) -> Result<TransformRequest> {
    let format = parse_format(format, profile.formats)?;
    if format == OutputFormat::Ico {
        return Ok(TransformRequest::IcoConvert { file });
    }
    Ok(TransformRequest::Compress {
        file,
        format,
        quality: parse_quality(quality, profile.default_quality),
    })
}

pub fn compress_request(
    file: UploadedFile,
    format: Option<&str>,
    quality: Option<&str>,
) -> Result<TransformRequest> {
    image_request(&COMPRESS, file, format, quality)
}

pub fn convert_request(
    file: UploadedFile,
    format: Option<&str>,
    quality: Option<&str>,
) -> Result<TransformRequest> {
    image_request(&CONVERT, file, format, quality)
}

/// Raw resize parameters as received.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResizeParams<'a> {
    pub format: Option<&'a str>,
    pub width: Option<&'a str>,
    pub height: Option<&'a str>,
    pub fit: Option<&'a str>,
    pub quality: Option<&'a str>,
}

pub fn resize_request(
    file: UploadedFile,
    params: ResizeParams<'_>,
    max_dimension: u32,
) -> Result<TransformRequest> {
    Ok(TransformRequest::Resize {
        format: parse_format(params.format, RESIZE.formats)?,
        width: parse_dimension(params.width, "width", max_dimension)?,
        height: parse_dimension(params.height, "height", max_dimension)?,
        fit: parse_fit(params.fit)?,
        quality: parse_quality(params.quality, RESIZE.default_quality),
        file,
    })
}

pub fn crop_request(
    file: UploadedFile,
    left: Option<&str>,
    top: Option<&str>,
    width: Option<&str>,
    height: Option<&str>,
) -> Result<TransformRequest> {
    Ok(TransformRequest::Crop {
        region: parse_crop(left, top, width, height)?,
        file,
    })
}

/// Keep every non-empty upload, in submission order.
pub fn merge_request(files: Vec<UploadedFile>) -> Result<TransformRequest> {
    let files: Vec<UploadedFile> = files.into_iter().filter(|f| !f.is_empty()).collect();
    if files.is_empty() {
        return Err(TransformError::NoFilesProvided);
    }
    Ok(TransformRequest::PdfMerge { files })
}

pub fn split_request(file: UploadedFile, pages: &str) -> Result<TransformRequest> {
    Ok(TransformRequest::PdfSplit {
        pages: parse_split_pages(pages)?,
        file,
    })
}

pub fn reorder_request(file: UploadedFile, order: &str) -> Result<TransformRequest> {
    Ok(TransformRequest::PdfReorder {
        order: parse_reorder(order)?,
        file,
    })
}

pub fn rotate_request(file: UploadedFile, angle: Option<&str>) -> Result<TransformRequest> {
    Ok(TransformRequest::PdfRotate {
        angle: parse_angle(angle)?,
        file,
    })
}
