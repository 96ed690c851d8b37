mod common;

use common::*;
use pdf_assemble::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_source_by_extension() {
    let dir = TempDir::new().unwrap();
    let pdf_path = dir.path().join("doc.pdf");
    let jpg_path = dir.path().join("photo.JPG");
    std::fs::write(&pdf_path, create_test_pdf(&[100, 200, 300])).unwrap();
    std::fs::write(&jpg_path, create_test_jpeg(12, 10)).unwrap();

    let sources = load_sources(&[&pdf_path, &jpg_path]).await.unwrap();
    assert_eq!(sources[0].kind(), SourceKind::Pdf);
    assert_eq!(sources[0].page_count(), 3);
    assert_eq!(sources[0].name(), "doc.pdf");
    assert_eq!(sources[1].kind(), SourceKind::Jpeg);
    assert_eq!(sources[1].page_count(), 1);
}

#[tokio::test]
async fn test_load_source_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    assert!(matches!(
        load_source(&path).await,
        Err(AssembleError::Format { .. })
    ));
}

#[tokio::test]
async fn test_load_missing_file() {
    let result = load_source("/nonexistent/missing.pdf").await;
    assert!(matches!(result, Err(AssembleError::Io(_))));
}

#[tokio::test]
async fn test_process_and_save() {
    let dir = TempDir::new().unwrap();
    let a = pdf_source("a.pdf", &[101, 102]);
    let b = pdf_source("b.pdf", &[201]);

    let plan = merge_plan(&[a, b]).unwrap();
    let files = process(plan, OutputFormat::Pdf, EncodeOptions::default(), MERGED_FILE_NAME)
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "merged.pdf");

    let out_dir = dir.path().join("out");
    let written = save_files(&files, &out_dir).await.unwrap();
    assert_eq!(written, vec![out_dir.join("merged.pdf")]);

    let bytes = std::fs::read(&written[0]).unwrap();
    assert_eq!(page_widths(&bytes), vec![101.0, 102.0, 201.0]);
}

#[tokio::test]
async fn test_process_rejects_invalid_plan_before_work() {
    let a = pdf_source("a.pdf", &[101]);
    let plan = merge_plan(&[a]).unwrap();

    let result = process(plan, OutputFormat::Pdf, EncodeOptions::default(), "x.pdf").await;
    assert!(matches!(result, Err(AssembleError::Validation(_))));
}

#[tokio::test]
async fn test_process_with_cancel() {
    let a = pdf_source("a.pdf", &[101, 102, 103]);
    let plan = split_plan(&a, &SplitMode::EveryPage).unwrap();

    let flag = CancelFlag::new();
    let assembler = Assembler::new().with_cancel(flag.clone());
    flag.cancel();

    let result = process_with(assembler, plan, OutputFormat::Pdf, EncodeOptions::default(), "").await;
    assert!(matches!(result, Err(AssembleError::Cancelled)));
}

#[tokio::test]
async fn test_source_store_keeps_sources_alive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.pdf");
    std::fs::write(&path, create_test_pdf(&[101, 102])).unwrap();

    let mut store = SourceStore::new();
    let id = {
        let source = store.insert(load_source(&path).await.unwrap());
        source.id()
    };

    let source = store.get(id).unwrap();
    let plan = rotate_plan(&source, Rotation::Clockwise90).unwrap();
    drop(source);

    let files = process(plan, OutputFormat::Pdf, EncodeOptions::default(), "a-rotated-90.pdf")
        .await
        .unwrap();
    assert_eq!(page_rotations(&files[0].bytes), vec![90, 90]);
    assert_eq!(store.len(), 1);
}
