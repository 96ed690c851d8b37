mod common;

use common::*;
use lopdf::{Document, Object};
use pdf_assemble::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn assemble_single(plan: &AssemblyPlan) -> AssembledDocument {
    match Assembler::new().assemble(plan).unwrap() {
        Assembly::Single(doc) => doc,
        Assembly::Many(_) => panic!("Expected a single document"),
    }
}

fn encode_plan(plan: &AssemblyPlan, options: &EncodeOptions) -> Vec<EncodedFile> {
    let assembly = Assembler::new().assemble(plan).unwrap();
    encode_assembly(
        assembly,
        plan.grouping(),
        OutputFormat::Pdf,
        options,
        "out.pdf",
    )
    .unwrap()
}

fn stream_text(stream: &lopdf::Stream) -> String {
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    String::from_utf8_lossy(&content).into_owned()
}

#[test]
fn test_merge_scenario_keeps_source_order() {
    let a = pdf_source("a.pdf", &[101, 102, 103]);
    let b = pdf_source("b.pdf", &[201, 202]);

    let mut plan = AssemblyPlan::new(Operation::Merge, Grouping::Single);
    plan.append_all_pages(&a).unwrap();
    plan.append_all_pages(&b).unwrap();
    plan.validate().unwrap();

    let doc = assemble_single(&plan);
    let origins: Vec<(SourceId, usize)> = doc
        .pages()
        .iter()
        .map(|p| (p.origin.source, p.origin.page_index))
        .collect();
    assert_eq!(
        origins,
        vec![
            (a.id(), 0),
            (a.id(), 1),
            (a.id(), 2),
            (b.id(), 0),
            (b.id(), 1)
        ]
    );

    let bytes = encode(doc, OutputFormat::Pdf, &EncodeOptions::default()).unwrap();
    assert_eq!(
        page_widths(&bytes),
        vec![101.0, 102.0, 103.0, 201.0, 202.0]
    );
}

#[test]
fn test_reordered_plan_encodes_in_plan_order() {
    let a = pdf_source("a.pdf", &[101, 102, 103]);
    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
    plan.append_all_pages(&a).unwrap();
    plan.reorder(0, 2).unwrap();

    let files = encode_plan(&plan, &EncodeOptions::default());
    assert_eq!(page_widths(&files[0].bytes), vec![102.0, 103.0, 101.0]);
}

#[test]
fn test_round_trip_keeps_geometry() {
    let bytes = create_inherited_pdf(3, 90);
    let source = Arc::new(PageSource::open("in.pdf", &bytes, SourceKind::Pdf).unwrap());
    let original: Vec<PageGeometry> = source.pages().copied().collect();
    assert_eq!(original[0].rotation, Rotation::Clockwise90);
    assert_eq!(original[0].width, 420.0);

    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
    plan.append_all_pages(&source).unwrap();
    let files = encode_plan(&plan, &EncodeOptions::default());

    let reopened = PageSource::open("out.pdf", &files[0].bytes, SourceKind::Pdf).unwrap();
    let round_tripped: Vec<PageGeometry> = reopened.pages().copied().collect();
    assert_eq!(round_tripped, original);
}

#[test]
fn test_rotate_adds_to_intrinsic_rotation() {
    let bytes = create_inherited_pdf(2, 90);
    let source = Arc::new(PageSource::open("in.pdf", &bytes, SourceKind::Pdf).unwrap());

    let plan = rotate_plan(&source, Rotation::Clockwise270).unwrap();
    plan.validate().unwrap();
    let files = encode_plan(&plan, &EncodeOptions::default());

    assert_eq!(page_rotations(&files[0].bytes), vec![0, 0]);
    assert_eq!(
        rotated_file_name(source.name(), Rotation::Clockwise270),
        "in-rotated-270.pdf"
    );
}

#[test]
fn test_split_every_page_names_and_counts() {
    let source = pdf_source("a.pdf", &[101, 102, 103, 104]);
    let plan = split_plan(&source, &SplitMode::EveryPage).unwrap();
    plan.validate().unwrap();

    let files = encode_plan(&plan, &EncodeOptions::default());
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["page-1.pdf", "page-2.pdf", "page-3.pdf", "page-4.pdf"]);

    for (i, file) in files.iter().enumerate() {
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(page_widths(&file.bytes), vec![101.0 + i as f32]);
    }
}

#[test]
fn test_split_ranges_one_document_per_range() {
    let source = pdf_source("a.pdf", &[101, 102, 103]);
    let ranges = parse_ranges("1-2, 3").unwrap();
    let plan = split_plan(&source, &SplitMode::Ranges(ranges)).unwrap();

    let files = encode_plan(&plan, &EncodeOptions::default());
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "part-1.pdf");
    assert_eq!(page_widths(&files[0].bytes), vec![101.0, 102.0]);
    assert_eq!(files[1].name, "part-2.pdf");
    assert_eq!(page_widths(&files[1].bytes), vec![103.0]);
}

#[test]
fn test_shared_source_reuse() {
    let source = pdf_source("a.pdf", &[101, 102, 103, 104]);
    let before: Vec<PageGeometry> = source.pages().copied().collect();

    let first = split_plan(&source, &SplitMode::Ranges(parse_ranges("1-3").unwrap())).unwrap();
    let second = split_plan(&source, &SplitMode::Ranges(parse_ranges("2-4").unwrap())).unwrap();

    let first_files = encode_plan(&first, &EncodeOptions::default());
    let second_files = encode_plan(&second, &EncodeOptions::default());

    assert_eq!(page_widths(&first_files[0].bytes), vec![101.0, 102.0, 103.0]);
    assert_eq!(page_widths(&second_files[0].bytes), vec![102.0, 103.0, 104.0]);

    let after: Vec<PageGeometry> = source.pages().copied().collect();
    assert_eq!(before, after);
    assert_eq!(source.page_count(), 4);
}

#[test]
fn test_concurrent_assemblies_share_a_source() {
    let source = pdf_source("a.pdf", &[101, 102, 103]);

    let results: Vec<Vec<f32>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let source = Arc::clone(&source);
                scope.spawn(move || {
                    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
                    plan.append_pages(&source, &[n % 3, (n + 1) % 3]).unwrap();
                    let files = encode_plan(&plan, &EncodeOptions::default());
                    page_widths(&files[0].bytes)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results[0], vec![101.0, 102.0]);
    assert_eq!(results[1], vec![102.0, 103.0]);
    assert_eq!(results[2], vec![103.0, 101.0]);
    assert_eq!(results[3], vec![101.0, 102.0]);
}

#[test]
fn test_shared_resources_copied_once() {
    let source = pdf_source("a.pdf", &[101, 102, 103]);
    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
    plan.append_all_pages(&source).unwrap();
    plan.append_all_pages(&source).unwrap();

    let files = encode_plan(&plan, &EncodeOptions::default());
    let doc = Document::load_mem(&files[0].bytes).unwrap();
    let fonts = doc
        .objects
        .values()
        .filter(|obj| match obj {
            Object::Dictionary(dict) => {
                matches!(dict.get(b"Type"), Ok(Object::Name(n)) if n == b"Font")
            }
            _ => false,
        })
        .count();
    assert_eq!(fonts, 1);
    assert_eq!(doc.get_pages().len(), 6);
}

#[test]
fn test_stale_source_aborts_assembly() {
    let mut store = SourceStore::new();
    let kept = store.insert(PageSource::open("a.pdf", &create_test_pdf(&[101]), SourceKind::Pdf).unwrap());
    let closed = store.insert(PageSource::open("b.pdf", &create_test_pdf(&[201]), SourceKind::Pdf).unwrap());
    let closed_id = closed.id();

    let mut plan = AssemblyPlan::new(Operation::Merge, Grouping::Single);
    plan.append_all_pages(&kept).unwrap();
    plan.append_all_pages(&closed).unwrap();
    plan.validate().unwrap();

    drop(closed);
    assert!(store.close(closed_id));
    assert!(!store.close(closed_id));
    assert_eq!(store.len(), 1);

    match Assembler::new().assemble(&plan) {
        Err(AssembleError::StaleSource(id)) => assert_eq!(id, closed_id),
        other => panic!("Expected StaleSource, got {:?}", other.map(|a| a.document_count())),
    }
}

#[test]
fn test_cancelled_assembly_returns_nothing() {
    let source = pdf_source("a.pdf", &[101, 102]);
    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
    plan.append_all_pages(&source).unwrap();

    let flag = CancelFlag::new();
    flag.cancel();
    let result = Assembler::new().with_cancel(flag).assemble(&plan);
    assert!(matches!(result, Err(AssembleError::Cancelled)));
}

#[test]
fn test_progress_reports_every_page() {
    let source = pdf_source("a.pdf", &[101, 102, 103]);
    let plan = split_plan(&source, &SplitMode::EveryPage).unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let assembly = Assembler::new()
        .with_progress(move |current, total| {
            assert_eq!(total, 3);
            counter.store(current, Ordering::SeqCst);
        })
        .assemble(&plan)
        .unwrap();

    assert_eq!(assembly.document_count(), 3);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_encoding_is_deterministic() {
    let a = pdf_source("a.pdf", &[101, 102]);
    let b = pdf_source("b.pdf", &[201]);
    let plan = merge_plan(&[a, b]).unwrap();

    let first = encode_plan(&plan, &EncodeOptions::default());
    let second = encode_plan(&plan, &EncodeOptions::default());
    assert_eq!(first, second);
}

#[test]
fn test_size_override_resizes_page() {
    let source = pdf_source("a.pdf", &[300, 400]);
    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
    plan.append_all_pages(&source).unwrap();
    let a4 = PaperSize::A4.page_size(Orientation::Portrait);
    plan.set_size_override(1, Some(a4)).unwrap();

    let files = encode_plan(&plan, &EncodeOptions::default());
    let widths = page_widths(&files[0].bytes);
    assert_eq!(widths[0], 300.0);
    assert!((widths[1] - a4.width).abs() < 0.01);
}

#[test]
fn test_size_override_with_indirect_media_box() {
    let bytes = create_indirect_box_pdf(300, 400);
    let source = Arc::new(PageSource::open("boxed.pdf", &bytes, SourceKind::Pdf).unwrap());
    assert_eq!(source.page_geometry(0).unwrap().width, 300.0);

    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
    plan.append_all_pages(&source).unwrap();
    plan.set_size_override(0, Some(PageSize::new(600.0, 800.0))).unwrap();

    let files = encode_plan(&plan, &EncodeOptions::default());
    assert_eq!(page_widths(&files[0].bytes), vec![600.0]);

    let doc = Document::load_mem(&files[0].bytes).unwrap();
    let streams: Vec<&lopdf::Stream> = doc
        .objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(stream) => Some(stream),
            _ => None,
        })
        .collect();

    let form = streams
        .iter()
        .find(|s| matches!(s.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Form"))
        .expect("wrapped page");
    let bbox: Vec<f32> = form
        .dict
        .get(b"BBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| match o {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r,
            other => panic!("expected a number, got {:?}", other),
        })
        .collect();
    assert_eq!(bbox, vec![0.0, 0.0, 300.0, 400.0]);

    // Both streams behind the indirect /Contents array end up in the form
    let form_content = stream_text(form);
    assert!(form_content.contains("% first"));
    assert!(form_content.contains("% second"));

    // The 300x400 page fills 600x800 exactly, so it is drawn at scale 2
    let page_ops = streams
        .iter()
        .map(|s| stream_text(s))
        .find(|ops| ops.contains("/Pg0 Do"))
        .expect("page placing the wrapped page");
    let matrix: Vec<f32> = page_ops
        .split_whitespace()
        .skip(1)
        .take(6)
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(matrix, vec![2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
}

#[test]
fn test_images_to_pdf() {
    let wide = jpeg_source("wide.jpg", 32, 16);
    let tall = jpeg_source("tall.jpg", 8, 24);
    assert_eq!(wide.page_count(), 1);
    assert_eq!(wide.page_geometry(0).unwrap().width, 32.0);

    let plan = images_plan(&[wide, tall]).unwrap();
    plan.validate().unwrap();

    let files = encode_plan(&plan, &EncodeOptions::default());
    let a4 = PaperSize::A4.page_size(Orientation::Portrait);
    for width in page_widths(&files[0].bytes) {
        assert!((width - a4.width).abs() < 0.01);
    }

    let doc = Document::load_mem(&files[0].bytes).unwrap();
    let images: Vec<_> = doc
        .objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(stream) => Some(stream),
            _ => None,
        })
        .filter(|stream| matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image"))
        .collect();
    assert_eq!(images.len(), 2);
    for image in images {
        assert!(matches!(image.dict.get(b"Filter"), Ok(Object::Name(n)) if n == b"DCTDecode"));
        // JPEG bytes are embedded untouched
        assert_eq!(&image.content[..2], &[0xFF, 0xD8]);
    }
}

#[test]
fn test_images_match_image_size() {
    let image = jpeg_source("a.jpg", 40, 20);
    let plan = images_plan(&[image]).unwrap();
    let options = EncodeOptions {
        image_page: ImagePageSize::MatchImage,
        ..Default::default()
    };

    let files = encode_plan(&plan, &options);
    assert_eq!(page_widths(&files[0].bytes), vec![40.0]);
}

#[test]
fn test_image_formats_are_unsupported() {
    let source = pdf_source("a.pdf", &[101]);
    let mut plan = AssemblyPlan::new(Operation::Custom, Grouping::Single);
    plan.append_all_pages(&source).unwrap();

    let assembly = Assembler::new().assemble(&plan).unwrap();
    let result = encode_assembly(
        assembly,
        plan.grouping(),
        OutputFormat::Jpeg,
        &EncodeOptions::default(),
        "out.jpg",
    );
    assert!(matches!(result, Err(AssembleError::UnsupportedFormat(_))));
}

#[test]
fn test_corrupt_inputs_are_format_errors() {
    assert!(matches!(
        PageSource::open("bad.pdf", b"not a pdf", SourceKind::Pdf),
        Err(AssembleError::Format { .. })
    ));
    let pdf = create_test_pdf(&[100]);
    assert!(matches!(
        PageSource::open("bad.jpg", &pdf, SourceKind::Jpeg),
        Err(AssembleError::Format { .. })
    ));
}
