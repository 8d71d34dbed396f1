//! PDF page operations on top of `lopdf`.
//!
//! All four operations parse the upload, build a brand new document from the
//! selected pages (or, for rotate, edit the parsed one in place) and return
//! the serialized bytes. Split output is written through a staged temp file
//! so the download body never exists twice in memory while it is streamed.

mod copy;

use std::io::Write;

use lopdf::{Document, Object};
use tracing::{debug, info, instrument, warn};

use crate::error::{ProcessingError, Result, TransformError};
use crate::request::{PageSelection, RotationAngle, RotationSummary, TransformResult, UploadedFile};
use crate::temp::TempStore;

use copy::{inherited_attribute, page_ids, resolve, save, OutputDocument, PageCopier};

/// Parse a PDF upload. Anything `lopdf` cannot read is a processing error.
pub fn load(data: &[u8]) -> Result<Document> {
    let document = Document::load_mem(data).map_err(ProcessingError::Pdf)?;
    debug!(pages = document.get_pages().len(), "PDF loaded");
    Ok(document)
}

/// Number of pages in a PDF upload.
pub fn page_count(data: &[u8]) -> Result<usize> {
    Ok(load(data)?.get_pages().len())
}

/// Map caller indices onto page ids. `None` marks an index outside the document.
fn select(pages: &[lopdf::ObjectId], indices: &[i64]) -> Vec<(i64, Option<lopdf::ObjectId>)> {
    indices
        .iter()
        .map(|&index| {
            let id = usize::try_from(index)
                .ok()
                .and_then(|index| pages.get(index).copied());
            (index, id)
        })
        .collect()
}

/// Runs page plans, staging split output in a [`TempStore`].
pub struct PdfPipeline<'a> {
    temp: &'a TempStore,
}

impl<'a> PdfPipeline<'a> {
    pub fn new(temp: &'a TempStore) -> Self {
        Self { temp }
    }

    /// Concatenate every page of every file in submission order.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub fn merge(&self, files: &[UploadedFile]) -> Result<TransformResult> {
        if files.is_empty() {
            return Err(TransformError::NoFilesProvided);
        }

        let mut output = OutputDocument::new();
        for file in files {
            let source = load(&file.data)?;
            let mut copier = PageCopier::new(&source);
            output.append_pages(&mut copier, &page_ids(&source))?;
            debug!(file = %file.name, total = output.page_count(), "Appended pages");
        }

        let pages = output.page_count();
        let data = output.finish()?;
        info!(pages, bytes = data.len(), "Merged PDF files");
        Ok(TransformResult::pdf(data))
    }

    /// Copy the selected pages in caller order. Indices outside the document
    /// are skipped.
    #[instrument(skip(self, data), fields(bytes = data.len(), requested = pages.len()))]
    pub fn split(&self, data: &[u8], pages: &PageSelection) -> Result<TransformResult> {
        let source = load(data)?;
        let source_pages = page_ids(&source);
        let mut copier = PageCopier::new(&source);
        let mut output = OutputDocument::new();

        let mut selected = Vec::with_capacity(pages.len());
        for (index, page_id) in select(&source_pages, pages.indices()) {
            match page_id {
                Some(page_id) => selected.push(page_id),
                None => debug!(index, available = source_pages.len(), "Skipping page"),
            }
        }
        output.append_pages(&mut copier, &selected)?;

        let pages = output.page_count();
        let bytes = output.finish()?;
        let data = self.temp.stage("pdf", |handle| -> Result<Vec<u8>> {
            {
                let file = handle.file_mut()?;
                file.write_all(&bytes)?;
                file.flush()?;
            }
            Ok(handle.read_to_vec()?)
        })?;
        info!(pages, bytes = data.len(), "Split PDF");
        Ok(TransformResult::pdf(data))
    }

    /// Rebuild the document from `order`. Every index must exist.
    #[instrument(skip(self, data), fields(bytes = data.len(), requested = order.len()))]
    pub fn reorder(&self, data: &[u8], order: &PageSelection) -> Result<TransformResult> {
        let source = load(data)?;
        let source_pages = page_ids(&source);
        let mut copier = PageCopier::new(&source);
        let mut output = OutputDocument::new();

        let selected = select(&source_pages, order.indices())
            .into_iter()
            .map(|(index, page_id)| {
                page_id.ok_or(ProcessingError::PageIndexOutOfBounds(index, source_pages.len()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        output.append_pages(&mut copier, &selected)?;

        let data = output.finish()?;
        info!(pages = order.len(), bytes = data.len(), "Reordered PDF");
        Ok(TransformResult::pdf(data))
    }

    /// Add `angle` to the effective `/Rotate` of every page.
    #[instrument(skip(self, data), fields(bytes = data.len(), angle = angle.to_degrees()))]
    pub fn rotate(&self, data: &[u8], angle: RotationAngle) -> Result<TransformResult> {
        let mut document = load(data)?;
        let pages = page_ids(&document);

        let mut rotations = Vec::with_capacity(pages.len());
        for &page_id in &pages {
            let page = document.get_dictionary(page_id).map_err(ProcessingError::Pdf)?;
            let current = inherited_attribute(&document, page, b"Rotate")
                .map(|value| resolve(&document, value))
                .and_then(|value| value.as_i64().ok())
                .unwrap_or(0);
            rotations.push((page_id, angle.apply_to(current)));
        }

        for (page_id, rotation) in rotations {
            let page = document
                .get_dictionary_mut(page_id)
                .map_err(ProcessingError::Pdf)?;
            page.set("Rotate", Object::Integer(rotation));
        }

        if pages.is_empty() {
            warn!("Rotating a PDF without pages");
        }
        let data = save(&mut document)?;
        info!(pages = pages.len(), bytes = data.len(), "Rotated PDF");
        Ok(TransformResult::pdf(data).with_rotation(RotationSummary {
            angle: angle.to_degrees(),
            pages: pages.len(),
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::temp::TempConfig;

    fn store() -> (TempDir, TempStore) {
        let dir = TempDir::new().unwrap();
        let store = TempStore::new(TempConfig::in_directory(dir.path()));
        (dir, store)
    }

    fn upload(name: &str, data: Vec<u8>) -> UploadedFile {
        UploadedFile::new("files", data).with_file_name(name)
    }

    #[test]
    fn test_merge_keeps_submission_order() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let files = vec![
            upload("a.pdf", numbered_pdf(2, None)),
            upload("b.pdf", numbered_pdf(3, None)),
        ];
        let result = pipeline.merge(&files).unwrap();

        assert_eq!(result.mime_type, "application/pdf");
        assert_eq!(page_numbers(&result.data), vec![1, 2, 1, 2, 3]);
        assert!(pages_have_resources(&result.data));
    }

    #[test]
    fn test_merge_without_files() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);
        assert!(matches!(
            pipeline.merge(&[]),
            Err(TransformError::NoFilesProvided)
        ));
    }

    #[test]
    fn test_merge_fails_on_corrupt_member() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);
        let files = vec![
            upload("a.pdf", numbered_pdf(1, None)),
            upload("b.pdf", b"not a pdf at all".to_vec()),
        ];

        let error = pipeline.merge(&files).unwrap_err();
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_split_skips_out_of_range_and_keeps_order() {
        let (dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let selection = PageSelection::from_page_numbers(&[5, 1, 99]);
        let result = pipeline.split(&numbered_pdf(5, None), &selection).unwrap();

        assert_eq!(page_numbers(&result.data), vec![5, 1]);
        assert!(pages_have_resources(&result.data));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_split_keeps_repeats() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let selection = PageSelection::from_page_numbers(&[2, 2, 0]);
        let result = pipeline.split(&numbered_pdf(3, None), &selection).unwrap();
        assert_eq!(page_numbers(&result.data), vec![2, 2]);
    }

    #[test]
    fn test_reorder_allows_duplicates_and_omissions() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let order = PageSelection::from_page_numbers(&[3, 1, 1]);
        let result = pipeline.reorder(&numbered_pdf(4, None), &order).unwrap();
        assert_eq!(page_numbers(&result.data), vec![3, 1, 1]);
    }

    #[test]
    fn test_links_to_later_pages_survive_copy() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let order = PageSelection::from_page_numbers(&[1, 2]);
        let result = pipeline.reorder(&annotated_pdf(), &order).unwrap();

        let (_, ids) = pages(&result.data);
        let (_, link) = first_page_annotation(&result.data, b"Link");
        let dest = link.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), ids[1]);
    }

    #[test]
    fn test_links_to_dropped_pages_become_null() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let selection = PageSelection::from_page_numbers(&[1]);
        let result = pipeline.split(&annotated_pdf(), &selection).unwrap();

        let (_, link) = first_page_annotation(&result.data, b"Link");
        let dest = link.get(b"Dest").unwrap().as_array().unwrap();
        assert!(matches!(dest[0], Object::Null));
    }

    #[test]
    fn test_widget_keeps_its_field_parent() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let selection = PageSelection::from_page_numbers(&[1]);
        let result = pipeline.split(&annotated_pdf(), &selection).unwrap();

        let (document, widget) = first_page_annotation(&result.data, b"Widget");
        let field_id = widget.get(b"Parent").unwrap().as_reference().unwrap();
        let field = document.get_dictionary(field_id).unwrap();
        assert_eq!(field.get(b"T").unwrap().as_str().unwrap(), b"name");
        assert_eq!(field.get(b"Kids").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_reorder_out_of_range_is_processing_error() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let order = PageSelection::from_page_numbers(&[1, 4]);
        let error = pipeline.reorder(&numbered_pdf(3, None), &order).unwrap_err();
        assert!(matches!(
            error,
            TransformError::Processing(ProcessingError::PageIndexOutOfBounds(3, 3))
        ));
    }

    #[test]
    fn test_rotate_twice_by_90_equals_180() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);
        let input = numbered_pdf(2, None);

        let once = pipeline.rotate(&input, RotationAngle::Clockwise90).unwrap();
        let twice = pipeline.rotate(&once.data, RotationAngle::Clockwise90).unwrap();
        let direct = pipeline.rotate(&input, RotationAngle::Rotate180).unwrap();

        assert_eq!(page_rotations(&twice.data), vec![180, 180]);
        assert_eq!(page_rotations(&twice.data), page_rotations(&direct.data));
        assert_eq!(
            direct.rotation,
            Some(RotationSummary {
                angle: 180,
                pages: 2
            })
        );
    }

    #[test]
    fn test_rotate_honours_inherited_rotation() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let result = pipeline
            .rotate(&numbered_pdf(2, Some(270)), RotationAngle::Rotate180)
            .unwrap();
        assert_eq!(page_rotations(&result.data), vec![90, 90]);
    }

    #[test]
    fn test_copied_pages_materialize_inherited_rotation() {
        let (_dir, store) = store();
        let pipeline = PdfPipeline::new(&store);

        let order = PageSelection::from_page_numbers(&[2]);
        let result = pipeline.reorder(&numbered_pdf(2, Some(90)), &order).unwrap();
        assert_eq!(page_rotations(&result.data), vec![90]);
    }

    #[test]
    fn test_corrupt_pdf_is_processing_error() {
        let (dir, store) = store();
        let pipeline = PdfPipeline::new(&store);
        let selection = PageSelection::from_page_numbers(&[1]);

        let error = pipeline.split(b"not a pdf", &selection).unwrap_err();
        assert!(matches!(
            error,
            TransformError::Processing(ProcessingError::Pdf(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(&numbered_pdf(4, None)).unwrap(), 4);
    }
}
