#![allow(dead_code)]

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_assemble::{PageSource, SourceKind};
use std::sync::Arc;

/// Build a PDF with one page per entry in `widths`.
///
/// Every page is 792pt tall and shares a single font resource; the MediaBox
/// width tags the page so tests can tell pages apart after assembly.
pub fn create_test_pdf(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");

    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::new();
    for (i, &width) in widths.iter().enumerate() {
        let text = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(widths.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    save(doc)
}

/// PDF whose MediaBox and Rotate live on the page tree root instead of the pages
pub fn create_inherited_pdf(num_pages: usize, rotate: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(420),
                Object::Integer(595),
            ]),
        ),
        ("Resources", Object::Dictionary(Dictionary::new())),
        ("Rotate", Object::Integer(rotate)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    save(doc)
}

/// One-page PDF whose /MediaBox and /Contents are both indirect objects.
///
/// /Contents points at an array of two streams, drawing `first` and `second`.
pub fn create_indirect_box_pdf(width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let media_box_id = doc.add_object(Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(width),
        Object::Integer(height),
    ]));
    let first = doc.add_object(Stream::new(Dictionary::new(), b"% first".to_vec()));
    let second = doc.add_object(Stream::new(Dictionary::new(), b"% second".to_vec()));
    let contents_id = doc.add_object(Object::Array(vec![
        Object::Reference(first),
        Object::Reference(second),
    ]));

    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("MediaBox", Object::Reference(media_box_id)),
        ("Resources", Object::Dictionary(Dictionary::new())),
        ("Contents", Object::Reference(contents_id)),
    ]));

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ("Count", Object::Integer(1)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    save(doc)
}

pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|i| [(i % 256) as u8, 128, 64])
        .collect();
    let mut bytes = Vec::new();
    JpegEncoder::new(&mut bytes)
        .encode(&pixels, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

pub fn pdf_source(name: &str, widths: &[i64]) -> Arc<PageSource> {
    Arc::new(PageSource::open(name, &create_test_pdf(widths), SourceKind::Pdf).unwrap())
}

pub fn jpeg_source(name: &str, width: u32, height: u32) -> Arc<PageSource> {
    Arc::new(
        PageSource::open(name, &create_test_jpeg(width, height), SourceKind::Jpeg).unwrap(),
    )
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    writer
}

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("expected a number, got {:?}", other),
    }
}

fn page_dicts(bytes: &[u8]) -> (Document, Vec<Dictionary>) {
    let doc = Document::load_mem(bytes).unwrap();
    let dicts = doc
        .get_pages()
        .values()
        .map(|&id| doc.get_dictionary(id).unwrap().clone())
        .collect();
    (doc, dicts)
}

/// MediaBox widths of an encoded PDF, in page order
pub fn page_widths(bytes: &[u8]) -> Vec<f32> {
    let (doc, pages) = page_dicts(bytes);
    pages
        .iter()
        .map(|page| {
            let media_box = doc
                .dereference(page.get(b"MediaBox").unwrap())
                .unwrap()
                .1
                .as_array()
                .unwrap()
                .clone();
            number(&media_box[2]) - number(&media_box[0])
        })
        .collect()
}

/// /Rotate of every page of an encoded PDF, in page order (missing = 0)
pub fn page_rotations(bytes: &[u8]) -> Vec<i64> {
    let (_, pages) = page_dicts(bytes);
    pages
        .iter()
        .map(|page| match page.get(b"Rotate") {
            Ok(Object::Integer(r)) => *r,
            _ => 0,
        })
        .collect()
}

pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).unwrap().get_pages().len()
}
