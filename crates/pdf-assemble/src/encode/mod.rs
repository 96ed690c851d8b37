//! Output encoding - serializing assembled documents into files
//!
//! Encoders consume an [`AssembledDocument`] and produce bytes. Output is
//! deterministic: the same plan over the same sources always encodes to the
//! same bytes.

mod pdf;

pub use pdf::PdfEncoder;

use crate::assemble::{AssembledDocument, Assembly};
use crate::options::EncodeOptions;
use crate::plan::Grouping;
use crate::types::*;
use std::fmt;
use std::str::FromStr;

/// Target file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputFormat {
    #[default]
    Pdf,
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AssembleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" | "application/pdf" => Ok(OutputFormat::Pdf),
            "jpg" | "jpeg" | "image/jpeg" => Ok(OutputFormat::Jpeg),
            "png" | "image/png" => Ok(OutputFormat::Png),
            other => Err(AssembleError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One finished output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Serializes assembled documents into one target format
pub trait OutputEncoder: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn encode(&self, document: AssembledDocument) -> Result<Vec<u8>>;
}

/// Look up the encoder for `format`
pub fn encoder_for(format: OutputFormat, options: &EncodeOptions) -> Result<Box<dyn OutputEncoder>> {
    match format {
        OutputFormat::Pdf => Ok(Box::new(PdfEncoder::new(options.clone()))),
        OutputFormat::Jpeg | OutputFormat::Png => Err(AssembleError::UnsupportedFormat(format!(
            "{} output requires page rasterization, which is not available",
            format.extension()
        ))),
    }
}

/// Encode a single document
pub fn encode(
    document: AssembledDocument,
    format: OutputFormat,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    encoder_for(format, options)?.encode(document)
}

/// Encode one file per document, named `page-1.ext`, `page-2.ext`, ...
pub fn encode_many(
    documents: Vec<AssembledDocument>,
    format: OutputFormat,
    options: &EncodeOptions,
) -> Result<Vec<EncodedFile>> {
    encode_numbered(documents, format, options, page_file_name)
}

/// Encode an assembly, naming files according to the grouping that produced it.
///
/// A single document is called `single_name`; per-page output uses
/// [`page_file_name`] and per-batch output [`part_file_name`].
pub fn encode_assembly(
    assembly: Assembly,
    grouping: Grouping,
    format: OutputFormat,
    options: &EncodeOptions,
    single_name: &str,
) -> Result<Vec<EncodedFile>> {
    match (assembly, grouping) {
        (Assembly::Single(document), _) => {
            let bytes = encode(document, format, options)?;
            Ok(vec![EncodedFile {
                name: single_name.to_string(),
                bytes,
                mime_type: format.mime_type(),
            }])
        }
        (Assembly::Many(documents), Grouping::PerBatch) => {
            encode_numbered(documents, format, options, part_file_name)
        }
        (Assembly::Many(documents), _) => encode_many(documents, format, options),
    }
}

pub fn page_file_name(number: usize, format: OutputFormat) -> String {
    format!("page-{}.{}", number, format.extension())
}

pub fn part_file_name(number: usize, format: OutputFormat) -> String {
    format!("part-{}.{}", number, format.extension())
}

fn encode_numbered(
    documents: Vec<AssembledDocument>,
    format: OutputFormat,
    options: &EncodeOptions,
    name: fn(usize, OutputFormat) -> String,
) -> Result<Vec<EncodedFile>> {
    let encoder = encoder_for(format, options)?;
    documents
        .into_iter()
        .enumerate()
        .map(|(i, document)| {
            Ok(EncodedFile {
                name: name(i + 1, format),
                bytes: encoder.encode(document)?,
                mime_type: format.mime_type(),
            })
        })
        .collect()
}
