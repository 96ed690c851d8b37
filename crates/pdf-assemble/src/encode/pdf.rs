//! PDF output

use super::{OutputEncoder, OutputFormat};
use crate::assemble::{AssembledDocument, AssembledPage, ImageData, PageContent};
use crate::constants::{IMAGE_XOBJECT, WRAPPED_PAGE_XOBJECT};
use crate::layout::{Anchor, Rect, place_content};
use crate::options::{EncodeOptions, ImagePageSize};
use crate::source::extract_number;
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Writes assembled documents as PDF using lopdf
#[derive(Debug, Clone, Default)]
pub struct PdfEncoder {
    options: EncodeOptions,
}

impl PdfEncoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Build the lopdf document without serializing it
    pub fn build_document(&self, document: AssembledDocument) -> Result<Document> {
        let (pages, pool) = document.into_parts();
        let (objects, max_id) = pool.into_parts();

        let mut output = Document::with_version(self.options.pdf_version.as_str());
        output.objects = objects;
        output.max_id = max_id;

        let pages_tree_id = output.new_object_id();
        let mut page_refs = Vec::with_capacity(pages.len());

        for page in pages {
            let page_id = match &page.content {
                PageContent::Pdf { page: dict } => match page.size_override {
                    Some(size) => self.write_resized_page(&mut output, dict, &page, size, pages_tree_id)?,
                    None => write_page(&mut output, dict.clone(), &page, pages_tree_id),
                },
                PageContent::Image(image) => {
                    self.write_image_page(&mut output, image, &page, pages_tree_id)
                }
            };
            page_refs.push(Object::Reference(page_id));
        }

        // Create pages tree
        let count = page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        output
            .objects
            .insert(pages_tree_id, Object::Dictionary(pages_dict));

        // Create catalog
        let catalog_id = output.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_tree_id)),
        ]));

        output.trailer.set("Root", catalog_id);

        Ok(output)
    }

    /// Wrap the page in a Form XObject and place it on a page of `size`
    fn write_resized_page(
        &self,
        output: &mut Document,
        page_dict: &Dictionary,
        page: &AssembledPage,
        size: PageSize,
        parent_pages_id: ObjectId,
    ) -> Result<ObjectId> {
        let bbox = media_box(output, page_dict);
        let [x1, y1, x2, y2] = bbox;

        let mut xobject_dict = Dictionary::new();
        xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
        xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        xobject_dict.set(
            "BBox",
            Object::Array(bbox.iter().map(|&v| Object::Real(v)).collect()),
        );
        xobject_dict.set("FormType", Object::Integer(1));
        if let Ok(resources) = page_dict.get(b"Resources") {
            xobject_dict.set("Resources", resources.clone());
        }
        let content = page_content(output, page_dict);
        let xobject_id = output.add_object(Stream::new(xobject_dict, content));

        let area = Rect::new(0.0, 0.0, size.width, size.height);
        let placement = place_content(
            &area,
            x2 - x1,
            y2 - y1,
            self.options.override_scaling,
            Anchor::Center,
        );
        let [a, b, c, d, e, f] = placement.matrix();
        // Shift the BBox origin onto the placement corner
        let e = e - a * x1;
        let f = f - d * y1;
        let ops = format!(
            "q {} {} {} {} {} {} cm /{} Do Q\n",
            a, b, c, d, e, f, WRAPPED_PAGE_XOBJECT
        );

        let mut xobjects = Dictionary::new();
        xobjects.set(WRAPPED_PAGE_XOBJECT, Object::Reference(xobject_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut new_page = Dictionary::new();
        new_page.set("Type", Object::Name(b"Page".to_vec()));
        new_page.set("MediaBox", page_box(size));
        new_page.set("Resources", Object::Dictionary(resources));
        let content_id = output.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
        new_page.set("Contents", Object::Reference(content_id));

        Ok(write_page(output, new_page, page, parent_pages_id))
    }

    fn write_image_page(
        &self,
        output: &mut Document,
        image: &ImageData,
        page: &AssembledPage,
        parent_pages_id: ObjectId,
    ) -> ObjectId {
        let size = page.size_override.unwrap_or(match self.options.image_page {
            ImagePageSize::Paper { size, orientation } => size.page_size(orientation),
            ImagePageSize::MatchImage => PageSize::new(image.width as f32, image.height as f32),
        });

        let color_space: &[u8] = match image.components {
            1 => b"DeviceGray",
            4 => b"DeviceCMYK",
            _ => b"DeviceRGB",
        };
        let mut image_dict = Dictionary::new();
        image_dict.set("Type", Object::Name(b"XObject".to_vec()));
        image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
        image_dict.set("Width", Object::Integer(image.width as i64));
        image_dict.set("Height", Object::Integer(image.height as i64));
        image_dict.set("ColorSpace", Object::Name(color_space.to_vec()));
        image_dict.set("BitsPerComponent", Object::Integer(8));
        image_dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        // JPEG data is embedded as-is, never recompressed
        let image_id = output
            .add_object(Stream::new(image_dict, image.data.to_vec()).with_compression(false));

        let anchor = if self.options.center_images {
            Anchor::Center
        } else {
            Anchor::TopLeft
        };
        let area = Rect::new(0.0, 0.0, size.width, size.height);
        let placement = place_content(
            &area,
            image.width as f32,
            image.height as f32,
            self.options.image_scaling,
            anchor,
        );
        let rect = placement.content_rect;
        let ops = format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            rect.width, rect.height, rect.x, rect.y, IMAGE_XOBJECT
        );

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_XOBJECT, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("MediaBox", page_box(size));
        page_dict.set("Resources", Object::Dictionary(resources));
        let content_id = output.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
        page_dict.set("Contents", Object::Reference(content_id));

        write_page(output, page_dict, page, parent_pages_id)
    }
}

impl OutputEncoder for PdfEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn encode(&self, document: AssembledDocument) -> Result<Vec<u8>> {
        let page_count = document.page_count();
        let mut output = self.build_document(document)?;
        if self.options.compress {
            output.compress();
        }

        let mut writer = Vec::new();
        output.save_to(&mut writer)?;
        log::info!(
            "Encoded {} page(s) into {} bytes of PDF",
            page_count,
            writer.len()
        );
        Ok(writer)
    }
}

/// Attach a page dictionary to the page tree with its final rotation
fn write_page(
    output: &mut Document,
    mut page_dict: Dictionary,
    page: &AssembledPage,
    parent_pages_id: ObjectId,
) -> ObjectId {
    page_dict.set("Parent", Object::Reference(parent_pages_id));
    page_dict.set("Rotate", Object::Integer(page.rotation.degrees() as i64));
    output.add_object(page_dict)
}

fn page_box(size: PageSize) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(size.width),
        Object::Real(size.height),
    ])
}

/// MediaBox corners of a resolved page, normalized so x1 < x2 and y1 < y2
fn media_box(output: &Document, page_dict: &Dictionary) -> [f32; 4] {
    let coords: Vec<f32> = page_dict
        .get(b"MediaBox")
        .map(|obj| deref(output, obj))
        .and_then(Object::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|obj| extract_number(deref(output, obj)))
                .collect()
        })
        .unwrap_or_default();
    match coords.as_slice() {
        &[x1, y1, x2, y2] => [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
        _ => {
            let (w, h) = crate::constants::DEFAULT_PAGE_DIMENSIONS;
            [0.0, 0.0, w, h]
        }
    }
}

/// Concatenated, decoded content streams of a resolved page
fn page_content(output: &Document, page_dict: &Dictionary) -> Vec<u8> {
    let refs: Vec<ObjectId> = match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => match output.objects.get(id) {
            // /Contents may point at an array of stream references
            Some(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
            _ => vec![*id],
        },
        Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => Vec::new(), // No content = blank page
    };

    let mut result = Vec::new();
    for id in refs {
        if let Some(Object::Stream(stream)) = output.objects.get(&id) {
            let content = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            result.extend_from_slice(&content);
            result.push(b'\n');
        }
    }
    result
}

fn deref<'a>(output: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => output.objects.get(id).unwrap_or(obj),
        _ => obj,
    }
}
