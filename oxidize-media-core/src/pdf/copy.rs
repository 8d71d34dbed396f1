//! Copying pages between `lopdf` documents.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{ProcessingError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Guard against malformed, cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Walk the `/Parent` chain of `page` looking for an inherited `key`.
pub(crate) fn inherited_attribute<'a>(
    document: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    if let Ok(value) = page.get(key) {
        return Some(value);
    }
    let mut parent = page.get(b"Parent").ok()?.as_reference().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        let node = document.get_dictionary(parent).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        parent = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Resolve one level of indirection.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Page object ids in document order.
pub(crate) fn page_ids(document: &Document) -> Vec<ObjectId> {
    document.get_pages().into_values().collect()
}

/// Clones pages out of one source document.
///
/// Objects shared between pages (fonts, images) are copied once per source.
/// Pages announced through [`PageCopier::reserve`] get their output ids up
/// front, so a link to a later page survives. References to any other source
/// page, or to the source page tree, become null.
pub(crate) struct PageCopier<'s> {
    source: &'s Document,
    source_pages: HashSet<ObjectId>,
    page_targets: HashMap<ObjectId, ObjectId>,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'s> PageCopier<'s> {
    pub(crate) fn new(source: &'s Document) -> Self {
        Self {
            source,
            source_pages: page_ids(source).into_iter().collect(),
            page_targets: HashMap::new(),
            copied: HashMap::new(),
        }
    }

    /// Allocate output ids for `pages` before any of them is copied.
    pub(crate) fn reserve(&mut self, target: &mut Document, pages: &[ObjectId]) {
        for &page_id in pages {
            self.page_targets
                .entry(page_id)
                .or_insert_with(|| target.new_object_id());
        }
    }

    /// Copy `page_id` into `target` as a child of `parent`. Returns the new id.
    ///
    /// The first copy of a page takes its reserved id; repeats get fresh ids.
    pub(crate) fn copy_page(
        &mut self,
        target: &mut Document,
        page_id: ObjectId,
        parent: ObjectId,
    ) -> Result<ObjectId> {
        let source = self.source;
        let page = source.get_dictionary(page_id).map_err(ProcessingError::Pdf)?;

        let new_id = match self.page_targets.get(&page_id) {
            Some(&reserved) if !target.objects.contains_key(&reserved) => reserved,
            Some(_) => target.new_object_id(),
            None => {
                let id = target.new_object_id();
                self.page_targets.insert(page_id, id);
                id
            }
        };

        let mut dict = Dictionary::new();
        for (key, value) in page.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            dict.set(key.clone(), self.clone_object(target, value)?);
        }
        for key in INHERITABLE {
            if dict.has(key.as_bytes()) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page, key.as_bytes()) {
                let value = self.clone_object(target, value)?;
                dict.set(key, value);
            }
        }
        dict.set("Parent", Object::Reference(parent));

        target.objects.insert(new_id, Object::Dictionary(dict));
        Ok(new_id)
    }

    fn clone_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let mut cloned = Dictionary::new();
        for (key, value) in dict.iter() {
            cloned.set(key.clone(), self.clone_object(target, value)?);
        }
        Ok(cloned)
    }

    fn clone_object(&mut self, target: &mut Document, object: &Object) -> Result<Object> {
        Ok(match object {
            Object::Reference(id) => self.clone_reference(target, *id)?,
            Object::Array(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                for item in items {
                    cloned.push(self.clone_object(target, item)?);
                }
                Object::Array(cloned)
            }
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(target, dict)?),
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(target, &stream.dict)?;
                Object::Stream(Stream::new(dict, stream.content.clone()))
            }
            other => other.clone(),
        })
    }

    fn clone_reference(&mut self, target: &mut Document, id: ObjectId) -> Result<Object> {
        if let Some(new_id) = self.page_targets.get(&id) {
            return Ok(Object::Reference(*new_id));
        }
        if let Some(new_id) = self.copied.get(&id) {
            return Ok(Object::Reference(*new_id));
        }
        let source = self.source;
        if self.source_pages.contains(&id) || is_page_tree_node(source, id) {
            return Ok(Object::Null);
        }

        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);
        let cloned = match source.get_object(id) {
            Ok(object) => self.clone_object(target, object)?,
            Err(_) => Object::Null,
        };
        target.objects.insert(new_id, cloned);
        Ok(Object::Reference(new_id))
    }
}

fn is_page_tree_node(document: &Document, id: ObjectId) -> bool {
    document
        .get_dictionary(id)
        .and_then(|dict| dict.get(b"Type"))
        .and_then(|kind| kind.as_name())
        .is_ok_and(|name| name == b"Pages")
}

/// A fresh document that pages are appended to.
pub(crate) struct OutputDocument {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl OutputDocument {
    pub(crate) fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Append `pages` in order. Links between them are kept.
    pub(crate) fn append_pages(
        &mut self,
        copier: &mut PageCopier<'_>,
        pages: &[ObjectId],
    ) -> Result<()> {
        copier.reserve(&mut self.document, pages);
        for &page_id in pages {
            let new_id = copier.copy_page(&mut self.document, page_id, self.pages_id)?;
            self.kids.push(Object::Reference(new_id));
        }
        Ok(())
    }

    pub(crate) fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Write the page tree and catalog, then serialize.
    pub(crate) fn finish(self) -> Result<Vec<u8>> {
        let OutputDocument {
            mut document,
            pages_id,
            kids,
        } = self;

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        document.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = document.add_object(Object::Dictionary(catalog));
        document.trailer.set("Root", Object::Reference(catalog_id));

        save(&mut document)
    }
}

pub(crate) fn save(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| ProcessingError::InvalidStructure(format!("failed to serialize PDF: {err}")))?;
    Ok(output)
}
