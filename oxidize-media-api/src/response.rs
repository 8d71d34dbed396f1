//! JSON envelopes returned by the transformation endpoints.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use oxidize_media::TransformResult;
use serde::{Deserialize, Serialize};

/// Image result as a data URI plus metadata.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEnvelope {
    /// `data:<mime>;base64,<payload>`
    pub file: String,
    pub ext: String,
    pub mime_type: String,
    /// Length of the encoded image in bytes, before base64
    pub file_length: usize,
}

impl From<TransformResult> for ImageEnvelope {
    fn from(result: TransformResult) -> Self {
        Self {
            file: format!("data:{};base64,{}", result.mime_type, STANDARD.encode(&result.data)),
            ext: result.extension.to_string(),
            mime_type: result.mime_type,
            file_length: result.byte_len,
        }
    }
}

/// A PDF as plain base64.
#[derive(Debug, Serialize, Deserialize)]
pub struct PdfEnvelope {
    pub file: String,
}

impl From<TransformResult> for PdfEnvelope {
    fn from(result: TransformResult) -> Self {
        Self {
            file: STANDARD.encode(&result.data),
        }
    }
}

/// Rotated PDF with the applied angle and page count.
#[derive(Debug, Serialize, Deserialize)]
pub struct RotateEnvelope {
    pub file: String,
    pub angle: i64,
    pub pages: usize,
}

impl From<TransformResult> for RotateEnvelope {
    fn from(result: TransformResult) -> Self {
        let (angle, pages) = result
            .rotation
            .map(|summary| (summary.angle, summary.pages))
            .unwrap_or_default();
        Self {
            file: STANDARD.encode(&result.data),
            angle,
            pages,
        }
    }
}
