//! Data model shared by the validator, the pipelines and the front ends.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// One uploaded multipart part (or a local file read by the CLI).
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the content arrived under
    pub name: String,
    /// Raw content
    pub data: Bytes,
    /// Client-side file name, when one was declared
    pub file_name: Option<String>,
    /// Declared content type, when one was declared
    pub content_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Image encodings the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
    Ico,
}

impl OutputFormat {
    /// Canonical extension; `jpg` requests come back as `jpeg`.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Ico => "ico",
        }
    }

    pub fn mime_type(self) -> String {
        format!("image/{}", self.extension())
    }

    /// Map a lower-cased format name to a format.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::Webp),
            "tiff" => Some(OutputFormat::Tiff),
            "ico" => Some(OutputFormat::Ico),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoder quality in `[1, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;
    /// PNG is lossless; its "quality" is a compression effort hint with a lower ceiling.
    pub const PNG_MAX: u8 = 90;

    /// Clamp any integer into the valid range.
    pub fn clamped(value: i64) -> Self {
        Quality(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Effective quality for an encoder.
    pub fn for_format(self, format: OutputFormat) -> Self {
        match format {
            OutputFormat::Png => Quality(self.0.min(Self::PNG_MAX)),
            _ => self,
        }
    }
}

/// How an image is scaled into a target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// Letterbox onto a transparent canvas of exactly the box size
    Contain,
    /// Fill the box, cropping the overflow from the centre
    Cover,
    /// Largest size that fits inside the box
    #[default]
    Inside,
    /// Smallest size that covers the box
    Outside,
    /// Stretch to the box, ignoring aspect ratio
    Fill,
}

impl Fit {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "contain" => Some(Fit::Contain),
            "cover" => Some(Fit::Cover),
            "inside" => Some(Fit::Inside),
            "outside" => Some(Fit::Outside),
            "fill" => Some(Fit::Fill),
            _ => None,
        }
    }
}

/// Exact pixel rectangle to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Page rotation accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationAngle {
    Clockwise90,
    Rotate180,
    Clockwise270,
}

impl RotationAngle {
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees {
            90 => Some(RotationAngle::Clockwise90),
            180 => Some(RotationAngle::Rotate180),
            270 => Some(RotationAngle::Clockwise270),
            _ => None,
        }
    }

    pub fn to_degrees(self) -> i64 {
        match self {
            RotationAngle::Clockwise90 => 90,
            RotationAngle::Rotate180 => 180,
            RotationAngle::Clockwise270 => 270,
        }
    }

    /// Compose with an existing `/Rotate` value.
    pub fn apply_to(self, current: i64) -> i64 {
        (current + self.to_degrees()).rem_euclid(360)
    }
}

/// 0-based page indices in caller order. Repeats are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection(Vec<i64>);

impl PageSelection {
    /// Build from 1-based page numbers.
    pub fn from_page_numbers(numbers: &[i64]) -> Self {
        PageSelection(numbers.iter().map(|n| n - 1).collect())
    }

    pub fn from_indices(indices: Vec<i64>) -> Self {
        PageSelection(indices)
    }

    pub fn indices(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A fully validated transformation. Exactly one operation per request.
#[derive(Debug, Clone)]
pub enum TransformRequest {
    Compress {
        file: UploadedFile,
        format: OutputFormat,
        quality: Quality,
    },
    Resize {
        file: UploadedFile,
        width: Option<u32>,
        height: Option<u32>,
        fit: Fit,
        format: OutputFormat,
        quality: Quality,
    },
    Crop {
        file: UploadedFile,
        region: CropRegion,
    },
    IcoConvert {
        file: UploadedFile,
    },
    PdfMerge {
        files: Vec<UploadedFile>,
    },
    PdfSplit {
        file: UploadedFile,
        pages: PageSelection,
    },
    PdfReorder {
        file: UploadedFile,
        order: PageSelection,
    },
    PdfRotate {
        file: UploadedFile,
        angle: RotationAngle,
    },
}

impl TransformRequest {
    /// Short operation name used in logs.
    pub fn operation(&self) -> &'static str {
        match self {
            TransformRequest::Compress { .. } => "compress",
            TransformRequest::Resize { .. } => "resize",
            TransformRequest::Crop { .. } => "crop",
            TransformRequest::IcoConvert { .. } => "ico",
            TransformRequest::PdfMerge { .. } => "pdf-merge",
            TransformRequest::PdfSplit { .. } => "pdf-split",
            TransformRequest::PdfReorder { .. } => "pdf-organize",
            TransformRequest::PdfRotate { .. } => "pdf-rotate",
        }
    }
}

/// Angle and page count echoed back by a rotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RotationSummary {
    pub angle: i64,
    pub pages: usize,
}

/// Output of one transformation.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub extension: &'static str,
    pub byte_len: usize,
    pub rotation: Option<RotationSummary>,
}

impl TransformResult {
    pub fn image(data: Vec<u8>, format: OutputFormat) -> Self {
        let byte_len = data.len();
        Self {
            data,
            mime_type: format.mime_type(),
            extension: format.extension(),
            byte_len,
            rotation: None,
        }
    }

    pub fn pdf(data: Vec<u8>) -> Self {
        let byte_len = data.len();
        Self {
            data,
            mime_type: "application/pdf".to_string(),
            extension: "pdf",
            byte_len,
            rotation: None,
        }
    }

    pub fn with_rotation(mut self, summary: RotationSummary) -> Self {
        self.rotation = Some(summary);
        self
    }
}
