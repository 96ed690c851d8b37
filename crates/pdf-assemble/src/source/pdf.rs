//! lopdf-backed PDF pages

use super::{PageBackend, SourceKind};
use crate::assemble::{CopyCache, ObjectPool, PageContent, copy_object_deep};
use crate::constants::{DEFAULT_PAGE_DIMENSIONS, INHERITABLE_PAGE_KEYS};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Guards against cyclic /Parent chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug)]
pub struct PdfBackend {
    document: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfBackend {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let document = Document::load_mem(bytes).map_err(|e| format_error(e.to_string()))?;
        Self::from_document(document)
    }

    /// Use an already parsed document
    pub fn from_document(document: Document) -> Result<Self> {
        if document.is_encrypted() {
            return Err(format_error("document is encrypted".to_string()));
        }
        let page_ids: Vec<ObjectId> = document.get_pages().values().copied().collect();
        Ok(Self { document, page_ids })
    }

    fn geometry(&self, page_id: ObjectId) -> PageGeometry {
        let (width, height) = self.media_box_size(page_id).unwrap_or_else(|| {
            log::warn!(
                "Page {:?} has no usable MediaBox, assuming {:?}",
                page_id,
                DEFAULT_PAGE_DIMENSIONS
            );
            DEFAULT_PAGE_DIMENSIONS
        });

        let rotation = match self.inherited(page_id, b"Rotate").and_then(extract_integer) {
            Some(degrees) => Rotation::from_degrees(degrees).unwrap_or_else(|_| {
                log::warn!("Page {:?} has invalid /Rotate {}, ignoring", page_id, degrees);
                Rotation::None
            }),
            None => Rotation::None,
        };

        PageGeometry {
            width,
            height,
            rotation,
        }
    }

    fn media_box_size(&self, page_id: ObjectId) -> Option<(f32, f32)> {
        let media_box = self.inherited(page_id, b"MediaBox")?.as_array().ok()?;
        if media_box.len() != 4 {
            return None;
        }
        let coords: Vec<f32> = media_box
            .iter()
            .filter_map(|obj| extract_number(self.deref(obj)))
            .collect();
        if coords.len() != 4 {
            return None;
        }
        let width = (coords[2] - coords[0]).abs();
        let height = (coords[3] - coords[1]).abs();
        (width > 0.0 && height > 0.0).then_some((width, height))
    }

    /// Look up a page attribute, walking up the page tree for inheritable keys
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(self.deref(value));
            }
            let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
            current = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    fn deref<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }
}

impl PageBackend for PdfBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Pdf
    }

    fn geometries(&self) -> Vec<PageGeometry> {
        self.page_ids.iter().map(|&id| self.geometry(id)).collect()
    }

    fn resolve(
        &self,
        index: usize,
        pool: &mut ObjectPool,
        cache: &mut CopyCache,
    ) -> Result<PageContent> {
        let page_id = self.page_ids[index];
        let page = self.document.get_dictionary(page_id)?;

        let mut resolved = Dictionary::new();
        for (key, value) in page.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            resolved.set(
                key.clone(),
                copy_object_deep(pool, &self.document, value, cache)?,
            );
        }

        // Flatten inherited attributes, the copy has no parent to inherit from
        for key in INHERITABLE_PAGE_KEYS {
            if resolved.has(key) {
                continue;
            }
            if let Some(value) = self.inherited(page_id, key) {
                resolved.set(
                    key.to_vec(),
                    copy_object_deep(pool, &self.document, value, cache)?,
                );
            }
        }

        if !resolved.has(b"MediaBox") {
            resolved.set("MediaBox", default_media_box());
        }

        log::debug!("Resolved PDF page {} ({:?})", index, page_id);
        Ok(PageContent::Pdf { page: resolved })
    }
}

fn format_error(reason: String) -> AssembleError {
    AssembleError::Format {
        kind: SourceKind::Pdf,
        reason,
    }
}

/// Default MediaBox for US Letter size
fn default_media_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(DEFAULT_PAGE_DIMENSIONS.0 as i64),
        Object::Integer(DEFAULT_PAGE_DIMENSIONS.1 as i64),
    ])
}

/// Extract numeric value from a PDF object
pub(crate) fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn extract_integer(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(r) if r.fract() == 0.0 => Some(*r as i64),
        _ => None,
    }
}
