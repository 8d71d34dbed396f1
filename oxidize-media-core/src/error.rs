use thiserror::Error;

/// Errors raised by the transformation pipelines.
///
/// Everything except [`TransformError::Processing`] is a validation failure
/// detected before any codec runs.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid angle: {0} (must be 90, 180 or 270)")]
    InvalidAngle(String),

    #[error("At least one page must be selected")]
    NoPagesSelected,

    #[error("No PDF files provided")]
    NoFilesProvided,

    #[error("Processing failed: {0}")]
    Processing(#[from] ProcessingError),
}

impl TransformError {
    /// True when the caller sent something invalid, false for codec and I/O
    /// failures on our side.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, TransformError::Processing(_))
    }
}

/// Codec-level failures. These are logged in full and never shown to callers.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Image decode error: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Image encode error: {0}")]
    Encode(#[source] image::ImageError),

    #[error("WebP encode error: {0}")]
    WebpEncode(String),

    #[error("Crop region {left},{top} {width}x{height} exceeds image bounds {image_width}x{image_height}")]
    CropOutOfBounds {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Page index {0} out of bounds (document has {1} pages)")]
    PageIndexOutOfBounds(i64, usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransformError>;

impl From<lopdf::Error> for TransformError {
    fn from(err: lopdf::Error) -> Self {
        TransformError::Processing(ProcessingError::Pdf(err))
    }
}

impl From<std::io::Error> for TransformError {
    fn from(err: std::io::Error) -> Self {
        TransformError::Processing(ProcessingError::Io(err))
    }
}
