//! Async file I/O and the blocking assembly pipeline

use crate::assemble::Assembler;
use crate::encode::{EncodedFile, OutputFormat, encode_assembly};
use crate::options::EncodeOptions;
use crate::plan::AssemblyPlan;
use crate::source::{PageSource, SourceKind};
use crate::types::*;
use std::path::{Path, PathBuf};

/// Load a single source, taking its kind from the file extension
pub async fn load_source(path: impl AsRef<Path>) -> Result<PageSource> {
    let path = path.as_ref();
    let kind = SourceKind::from_path(path)?;
    load_source_as(path, kind).await
}

/// Load a single source of a known kind
pub async fn load_source_as(path: impl AsRef<Path>, kind: SourceKind) -> Result<PageSource> {
    let path = path.as_ref().to_owned();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = tokio::fs::read(&path).await?;
    let source =
        tokio::task::spawn_blocking(move || PageSource::open(name, &bytes, kind)).await??;
    Ok(source)
}

/// Load multiple sources, in order
pub async fn load_sources(paths: &[impl AsRef<Path>]) -> Result<Vec<PageSource>> {
    let mut sources = Vec::new();
    for path in paths {
        sources.push(load_source(path).await?);
    }
    Ok(sources)
}

/// Validate, assemble and encode `plan` with a default assembler
pub async fn process(
    plan: AssemblyPlan,
    format: OutputFormat,
    options: EncodeOptions,
    single_name: impl Into<String>,
) -> Result<Vec<EncodedFile>> {
    process_with(Assembler::new(), plan, format, options, single_name).await
}

/// Like [`process`], using `assembler` for cancellation and progress
pub async fn process_with(
    assembler: Assembler,
    plan: AssemblyPlan,
    format: OutputFormat,
    options: EncodeOptions,
    single_name: impl Into<String>,
) -> Result<Vec<EncodedFile>> {
    plan.validate()?;
    let single_name = single_name.into();
    let files = tokio::task::spawn_blocking(move || {
        let assembly = assembler.assemble(&plan)?;
        encode_assembly(assembly, plan.grouping(), format, &options, &single_name)
    })
    .await??;
    Ok(files)
}

/// Write every file into `dir`, creating it if needed
pub async fn save_files(files: &[EncodedFile], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        tokio::fs::write(&path, &file.bytes).await?;
        log::info!("Wrote {} ({} bytes)", path.display(), file.bytes.len());
        written.push(path);
    }
    Ok(written)
}
