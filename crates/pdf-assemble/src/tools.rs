//! Plans for the built-in tools: merge, split, rotate and images to PDF

use crate::plan::{AssemblyPlan, Grouping, Operation};
use crate::ranges::PageRange;
use crate::source::PageSource;
use crate::types::*;
use std::path::Path;
use std::sync::Arc;

pub const MERGED_FILE_NAME: &str = "merged.pdf";
pub const IMAGES_FILE_NAME: &str = "images.pdf";

/// How a split distributes pages over output documents
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitMode {
    /// One document per page
    EveryPage,
    /// One document per range, in the order given
    Ranges(Vec<PageRange>),
    /// Consecutive documents of `n` pages; the last may be shorter
    Chunks(usize),
}

/// All pages of every source, in the order given
pub fn merge_plan(sources: &[Arc<PageSource>]) -> Result<AssemblyPlan> {
    let mut plan = AssemblyPlan::new(Operation::Merge, Grouping::Single);
    for source in sources {
        plan.append_all_pages(source)?;
    }
    Ok(plan)
}

pub fn split_plan(source: &Arc<PageSource>, mode: &SplitMode) -> Result<AssemblyPlan> {
    match mode {
        SplitMode::EveryPage => {
            let mut plan = AssemblyPlan::new(Operation::Split, Grouping::PerPage);
            plan.append_all_pages(source)?;
            Ok(plan)
        }
        SplitMode::Ranges(ranges) => {
            let mut plan = AssemblyPlan::new(Operation::Split, Grouping::PerBatch);
            let count = source.page_count();
            // Reject out-of-range ends before collecting indices
            if let Some(range) = ranges.iter().find(|r| r.end > count) {
                return Err(AssembleError::index("page", range.end - 1, count));
            }
            for range in ranges {
                let indices: Vec<usize> = range.indices().collect();
                plan.append_pages(source, &indices)?;
            }
            Ok(plan)
        }
        SplitMode::Chunks(0) => Err(AssembleError::InvalidValue(
            "chunk size must be at least 1".to_string(),
        )),
        SplitMode::Chunks(size) => {
            let mut plan = AssemblyPlan::new(Operation::Split, Grouping::PerBatch);
            let indices: Vec<usize> = (0..source.page_count()).collect();
            for chunk in indices.chunks(*size) {
                plan.append_pages(source, chunk)?;
            }
            Ok(plan)
        }
    }
}

/// Every page of `source`, turned by `rotation` on top of its current angle
pub fn rotate_plan(source: &Arc<PageSource>, rotation: Rotation) -> Result<AssemblyPlan> {
    let mut plan = AssemblyPlan::new(Operation::Rotate, Grouping::Single);
    plan.append_all_pages(source)?;
    plan.rotate_all(rotation.degrees() as i64)?;
    Ok(plan)
}

/// One page per image, in the order given
pub fn images_plan(sources: &[Arc<PageSource>]) -> Result<AssemblyPlan> {
    let mut plan = AssemblyPlan::new(Operation::ImagesToPdf, Grouping::Single);
    for source in sources {
        plan.append_all_pages(source)?;
    }
    Ok(plan)
}

/// `report.pdf` rotated by 90 becomes `report-rotated-90.pdf`
pub fn rotated_file_name(source_name: &str, rotation: Rotation) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{}-rotated-{}.pdf", stem, rotation.degrees())
}
