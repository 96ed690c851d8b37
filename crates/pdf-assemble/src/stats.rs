use crate::plan::AssemblyPlan;
use crate::types::*;

/// What a plan will produce, computed without copying any page content
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanSummary {
    /// Distinct sources referenced
    pub sources: usize,
    /// Total pages across those sources
    pub source_pages: usize,
    pub planned_pages: usize,
    pub output_documents: usize,
    /// Pages with a non-zero rotation delta
    pub rotated_pages: usize,
}

/// Summarize the plan; fails if a referenced source has been dropped
pub fn summarize(plan: &AssemblyPlan) -> Result<PlanSummary> {
    let sources = plan.upgrade_sources()?;
    let source_pages = sources.values().map(|s| s.page_count()).sum();

    let rotated_pages = plan
        .descriptors()
        .iter()
        .filter(|d| d.rotation() != Rotation::None)
        .count();

    Ok(PlanSummary {
        sources: sources.len(),
        source_pages,
        planned_pages: plan.len(),
        output_documents: plan.groups().len(),
        rotated_pages,
    })
}
