//! Document assembly engine for PDF and JPEG sources.
//!
//! Sources are parsed once into [`PageSource`]s and shared through `Arc`.
//! An [`AssemblyPlan`] lists which source page goes where and how it is
//! rotated; the [`Assembler`] turns a plan into self-contained documents and
//! an [`OutputEncoder`] writes them out.

pub mod assemble;
pub mod constants;
pub mod encode;
mod io;
pub mod layout;
mod options;
pub mod plan;
mod ranges;
pub mod source;
mod stats;
mod store;
pub mod tools;
mod types;

pub use assemble::{
    AssembledDocument, AssembledPage, Assembler, Assembly, CancelFlag, ImageData, PageContent,
    PageOrigin,
};
pub use encode::{
    EncodedFile, OutputEncoder, OutputFormat, PdfEncoder, encode, encode_assembly, encode_many,
    encoder_for,
};
pub use io::{load_source, load_source_as, load_sources, process, process_with, save_files};
pub use options::*;
pub use plan::{AssemblyPlan, Grouping, Operation, PageDescriptor, Violation};
pub use ranges::{PageRange, parse_ranges};
pub use source::{PageBackend, PageSource, SourceId, SourceKind};
pub use stats::{PlanSummary, summarize};
pub use store::SourceStore;
pub use tools::{
    IMAGES_FILE_NAME, MERGED_FILE_NAME, SplitMode, images_plan, merge_plan, rotate_plan,
    rotated_file_name, split_plan,
};
pub use types::*;
