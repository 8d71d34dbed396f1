//! Buffered multipart form bodies.

use axum::extract::Multipart;
use oxidize_media::UploadedFile;
use tracing::debug;

use crate::error::AppError;

/// Every part of a multipart body, in submission order.
#[derive(Debug, Default)]
pub struct FormData {
    parts: Vec<UploadedFile>,
}

impl FormData {
    /// Drain `multipart` into memory. A malformed body is a client error.
    pub async fn collect(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut parts = Vec::new();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;

            let mut part = UploadedFile::new(name, data);
            if let Some(file_name) = file_name {
                part = part.with_file_name(file_name);
            }
            if let Some(content_type) = content_type {
                part = part.with_content_type(content_type);
            }
            parts.push(part);
        }
        debug!(parts = parts.len(), "Multipart body collected");
        Ok(Self { parts })
    }

    pub fn from_parts(parts: Vec<UploadedFile>) -> Self {
        Self { parts }
    }

    /// First non-empty upload under `name`.
    pub fn file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self
            .parts
            .iter()
            .position(|part| part.name == name && !part.is_empty())?;
        Some(self.parts.remove(index))
    }

    /// Every upload whose field name is one of `names`, in submission order.
    pub fn files(&mut self, names: &[&str]) -> Vec<UploadedFile> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.parts)
            .into_iter()
            .partition(|part| names.contains(&part.name.as_str()));
        self.parts = rest;
        matching
    }

    /// A text field decoded as UTF-8.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|part| part.name == name)
            .and_then(|part| std::str::from_utf8(&part.data).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form() -> FormData {
        FormData::from_parts(vec![
            UploadedFile::new("file", Vec::new()),
            UploadedFile::new("file", b"%PDF".to_vec()),
            UploadedFile::new("pages", "[1,2]"),
            UploadedFile::new("files", b"a".to_vec()),
            UploadedFile::new("files[]", b"b".to_vec()),
        ])
    }

    #[test]
    fn test_file_skips_empty_uploads() {
        let mut form = form();
        let file = form.file("file").unwrap();
        assert_eq!(file.data.as_ref(), b"%PDF");
        assert!(form.file("missing").is_none());
    }

    #[test]
    fn test_text_field() {
        let form = form();
        assert_eq!(form.text("pages"), Some("[1,2]"));
        assert_eq!(form.text("order"), None);
    }

    #[test]
    fn test_files_keep_order_across_aliases() {
        let mut form = form();
        let names: Vec<_> = form
            .files(&["files", "files[]"])
            .into_iter()
            .map(|f| f.data.to_vec())
            .collect();
        assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
