//! # oxidize-media
//!
//! Image and PDF transformation pipelines.
//!
//! Every operation follows the same discipline: untrusted parameters are
//! turned into a typed [`TransformRequest`] by the [`params`] validator, the
//! request is executed against the image or PDF codec, and any temporary file
//! staged on the way is released before [`execute`] returns.
//!
//! ```ignore
//! use oxidize_media::{execute, params, TempStore, UploadedFile};
//!
//! let store = TempStore::with_defaults();
//! let file = UploadedFile::new("file", std::fs::read("photo.jpg")?);
//! let request = params::compress_request(file, Some("webp"), Some("75"))?;
//! let result = execute(request, &store)?;
//! std::fs::write("photo.webp", &result.data)?;
//! ```

pub mod error;
pub mod image;
pub mod params;
pub mod pdf;
pub mod pipeline;
pub mod request;
pub mod temp;

pub use error::{ProcessingError, Result, TransformError};
pub use pipeline::execute;
pub use request::{
    CropRegion, Fit, OutputFormat, PageSelection, Quality, RotationAngle, RotationSummary,
    TransformRequest, TransformResult, UploadedFile,
};
pub use temp::{ReleaseOutcome, SweepReport, TempConfig, TempHandle, TempStore};
