//! # oxidize-media-api
//!
//! HTTP front end for the oxidize-media transformation pipelines.
//!
//! Every `/api` route requires the shared secret in `x-api-key`; `/health`
//! is open. CPU-bound work runs on tokio's blocking pool.

mod api;
mod auth;
mod config;
mod error;
mod form;
mod response;
mod state;
mod sweeper;

pub use api::{
    app, compress_image, convert_image, crop_image, health_check, pdf_merge, pdf_organize,
    pdf_rotate, pdf_split, resize_image, router, ImageQuery,
};
pub use auth::{API_KEY_HEADER, PROTECTED_PREFIX};
pub use config::{ServerArgs, ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::{AppError, ErrorResponse, Operation};
pub use form::FormData;
pub use response::{ImageEnvelope, PdfEnvelope, RotateEnvelope};
pub use state::AppState;
pub use sweeper::{spawn_sweeper, sweep_once};
