//! Single entry point that routes a validated request to its pipeline.

use std::time::Instant;

use tracing::{info, warn};

use crate::error::Result;
use crate::image::ImagePipeline;
use crate::pdf::PdfPipeline;
use crate::request::{TransformRequest, TransformResult};
use crate::temp::TempStore;

/// Run one transformation. Temp files staged on the way are gone when this
/// returns, whatever the outcome.
pub fn execute(request: TransformRequest, temp: &TempStore) -> Result<TransformResult> {
    let operation = request.operation();
    let started = Instant::now();

    let images = ImagePipeline::new(temp);
    let pdfs = PdfPipeline::new(temp);
    let result = match request {
        TransformRequest::Compress {
            file,
            format,
            quality,
        } => images.compress(&file.data, format, quality),
        TransformRequest::Resize {
            file,
            width,
            height,
            fit,
            format,
            quality,
        } => images.resize(&file.data, width, height, fit, format, quality),
        TransformRequest::Crop { file, region } => images.crop(&file.data, region),
        TransformRequest::IcoConvert { file } => images.ico(&file.data),
        TransformRequest::PdfMerge { files } => pdfs.merge(&files),
        TransformRequest::PdfSplit { file, pages } => pdfs.split(&file.data, &pages),
        TransformRequest::PdfReorder { file, order } => pdfs.reorder(&file.data, &order),
        TransformRequest::PdfRotate { file, angle } => pdfs.rotate(&file.data, angle),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(output) => info!(
            operation,
            bytes = output.byte_len,
            mime = %output.mime_type,
            elapsed_ms,
            "Transformation complete"
        ),
        Err(err) => warn!(operation, error = %err, elapsed_ms, "Transformation failed"),
    }
    result
}
