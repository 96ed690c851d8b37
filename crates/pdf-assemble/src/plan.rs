//! Assembly plans - the ordered list of pages an operation will produce
//!
//! A plan is cheap to build and edit. It records which source page goes where
//! and how it is rotated, and checks indices as pages are appended, so every
//! problem surfaces before any page content is copied.

use crate::source::{PageSource, SourceId, SourceKind};
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

/// Which tool the plan is built for; selects the validation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    /// Combine two or more PDFs into one
    Merge,
    /// Extract pages of one PDF into one or more documents
    Split,
    /// Rotate the pages of one PDF
    Rotate,
    /// Turn one or more images into a PDF
    ImagesToPdf,
    /// No policy; any plan is accepted, including an empty one
    Custom,
}

impl Operation {
    fn allows_multiple_outputs(self) -> bool {
        matches!(self, Operation::Split | Operation::Custom)
    }
}

/// How plan pages are grouped into output documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Grouping {
    /// Every page goes into one document
    #[default]
    Single,
    /// One document per page
    PerPage,
    /// One document per `append_pages` call (page ranges)
    PerBatch,
}

/// One planned output page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDescriptor {
    source: SourceId,
    page_index: usize,
    rotation: Rotation,
    size_override: Option<PageSize>,
    batch: usize,
}

impl PageDescriptor {
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Zero-based page index within the source
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Rotation added on top of the page's intrinsic rotation
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn size_override(&self) -> Option<PageSize> {
        self.size_override
    }

    /// The `append_pages` call this page came from
    pub fn batch(&self) -> usize {
        self.batch
    }
}

/// A policy problem found by [`AssemblyPlan::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The operation needs at least one page
    NoPages,
    TooFewSources { required: usize, found: usize },
    TooManySources { allowed: usize, found: usize },
    WrongSourceKind {
        source: SourceId,
        expected: SourceKind,
        found: SourceKind,
    },
    GroupingNotAllowed(Grouping),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NoPages => f.write_str("no pages selected"),
            Violation::TooFewSources { required, found } => write!(
                f,
                "at least {required} distinct files are required, found {found}"
            ),
            Violation::TooManySources { allowed, found } => {
                write!(f, "at most {allowed} file is allowed, found {found}")
            }
            Violation::WrongSourceKind {
                source,
                expected,
                found,
            } => write!(f, "source {source} is {found}, expected {expected}"),
            Violation::GroupingNotAllowed(grouping) => {
                write!(f, "{grouping:?} output is not available for this operation")
            }
        }
    }
}

/// Weak handle plus the facts validation needs without upgrading it
#[derive(Debug, Clone)]
struct SourceEntry {
    handle: Weak<PageSource>,
    kind: SourceKind,
}

/// Ordered, editable list of [`PageDescriptor`]s for one output operation
#[derive(Debug, Clone)]
pub struct AssemblyPlan {
    operation: Operation,
    grouping: Grouping,
    pages: Vec<PageDescriptor>,
    sources: BTreeMap<SourceId, SourceEntry>,
    next_batch: usize,
}

impl AssemblyPlan {
    pub fn new(operation: Operation, grouping: Grouping) -> Self {
        Self {
            operation,
            grouping,
            pages: Vec::new(),
            sources: BTreeMap::new(),
            next_batch: 0,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    pub fn descriptors(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Distinct sources referenced by the current pages, in id order
    pub fn source_ids(&self) -> Vec<SourceId> {
        let ids: BTreeSet<SourceId> = self.pages.iter().map(|d| d.source).collect();
        ids.into_iter().collect()
    }

    /// Append one page per index, in the given order, as a new batch.
    ///
    /// Nothing is appended if any index is out of range.
    pub fn append_pages(&mut self, source: &Arc<PageSource>, indices: &[usize]) -> Result<()> {
        let count = source.page_count();
        if let Some(&bad) = indices.iter().find(|&&i| i >= count) {
            return Err(AssembleError::index("page", bad, count));
        }

        self.sources
            .entry(source.id())
            .or_insert_with(|| SourceEntry {
                handle: Arc::downgrade(source),
                kind: source.kind(),
            });

        let batch = self.next_batch;
        self.next_batch += 1;
        self.pages.extend(indices.iter().map(|&page_index| PageDescriptor {
            source: source.id(),
            page_index,
            rotation: Rotation::None,
            size_override: None,
            batch,
        }));
        Ok(())
    }

    pub fn append_all_pages(&mut self, source: &Arc<PageSource>) -> Result<()> {
        let indices: Vec<usize> = (0..source.page_count()).collect();
        self.append_pages(source, &indices)
    }

    /// Rotate every page of the most recent `append_pages` batch by `delta` degrees
    pub fn rotate_last(&mut self, delta: i64) -> Result<()> {
        let rotation = Rotation::from_degrees(delta)?;
        let batch = self
            .next_batch
            .checked_sub(1)
            .ok_or_else(|| AssembleError::index("batch", 0, 0))?;
        self.pages
            .iter_mut()
            .filter(|d| d.batch == batch)
            .for_each(|d| d.rotation = d.rotation + rotation);
        Ok(())
    }

    /// Rotate every page in the plan by `delta` degrees
    pub fn rotate_all(&mut self, delta: i64) -> Result<()> {
        let rotation = Rotation::from_degrees(delta)?;
        for descriptor in &mut self.pages {
            descriptor.rotation = descriptor.rotation + rotation;
        }
        Ok(())
    }

    /// Rotate the page at plan position `index` by `delta` degrees
    pub fn rotate_at(&mut self, index: usize, delta: i64) -> Result<()> {
        let rotation = Rotation::from_degrees(delta)?;
        let len = self.pages.len();
        let descriptor = self
            .pages
            .get_mut(index)
            .ok_or_else(|| AssembleError::index("position", index, len))?;
        descriptor.rotation = descriptor.rotation + rotation;
        Ok(())
    }

    /// Place the page at `index` on a page of the given size instead of its own
    pub fn set_size_override(&mut self, index: usize, size: Option<PageSize>) -> Result<()> {
        if let Some(size) = size {
            if !(size.width > 0.0 && size.height > 0.0) {
                return Err(AssembleError::InvalidValue(format!(
                    "page size must be positive, got {}x{}",
                    size.width, size.height
                )));
            }
        }
        let len = self.pages.len();
        let descriptor = self
            .pages
            .get_mut(index)
            .ok_or_else(|| AssembleError::index("position", index, len))?;
        descriptor.size_override = size;
        Ok(())
    }

    /// Move the descriptor at `from` so that it ends up at position `to`
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.pages.len();
        if from >= len {
            return Err(AssembleError::index("position", from, len));
        }
        if to >= len {
            return Err(AssembleError::index("position", to, len));
        }
        let descriptor = self.pages.remove(from);
        self.pages.insert(to, descriptor);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<PageDescriptor> {
        let len = self.pages.len();
        if index >= len {
            return Err(AssembleError::index("position", index, len));
        }
        let removed = self.pages.remove(index);
        if !self.pages.iter().any(|d| d.source == removed.source) {
            self.sources.remove(&removed.source);
        }
        Ok(removed)
    }

    /// Check the plan against its operation's policy, reporting every violation at once
    pub fn validate(&self) -> Result<()> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AssembleError::Validation(ValidationErrors(violations)))
        }
    }

    fn violations(&self) -> Vec<Violation> {
        let (min_sources, max_sources, kind) = match self.operation {
            Operation::Custom => return Vec::new(),
            Operation::Merge => (2, None, SourceKind::Pdf),
            Operation::Split | Operation::Rotate => (1, Some(1), SourceKind::Pdf),
            Operation::ImagesToPdf => (1, None, SourceKind::Jpeg),
        };

        let mut violations = Vec::new();
        let source_ids = self.source_ids();

        if self.pages.is_empty() {
            violations.push(Violation::NoPages);
        }
        if source_ids.len() < min_sources && !(min_sources == 1 && self.pages.is_empty()) {
            violations.push(Violation::TooFewSources {
                required: min_sources,
                found: source_ids.len(),
            });
        }
        if let Some(allowed) = max_sources {
            if source_ids.len() > allowed {
                violations.push(Violation::TooManySources {
                    allowed,
                    found: source_ids.len(),
                });
            }
        }
        for id in &source_ids {
            if let Some(entry) = self.sources.get(id) {
                if entry.kind != kind {
                    violations.push(Violation::WrongSourceKind {
                        source: *id,
                        expected: kind,
                        found: entry.kind,
                    });
                }
            }
        }
        if self.grouping != Grouping::Single && !self.operation.allows_multiple_outputs() {
            violations.push(Violation::GroupingNotAllowed(self.grouping));
        }

        violations
    }

    /// Upgrade every referenced source, failing if any has been dropped
    pub(crate) fn upgrade_sources(&self) -> Result<HashMap<SourceId, Arc<PageSource>>> {
        let mut handles = HashMap::new();
        for id in self.source_ids() {
            let source = self
                .sources
                .get(&id)
                .and_then(|entry| entry.handle.upgrade())
                .ok_or(AssembleError::StaleSource(id))?;
            handles.insert(id, source);
        }
        Ok(handles)
    }

    /// Descriptor groups in output order, one per output document
    pub(crate) fn groups(&self) -> Vec<Vec<PageDescriptor>> {
        match self.grouping {
            Grouping::Single => vec![self.pages.clone()],
            Grouping::PerPage => self.pages.iter().map(|d| vec![*d]).collect(),
            Grouping::PerBatch => {
                let mut order: Vec<usize> = Vec::new();
                let mut groups: HashMap<usize, Vec<PageDescriptor>> = HashMap::new();
                for descriptor in &self.pages {
                    groups
                        .entry(descriptor.batch)
                        .or_insert_with(|| {
                            order.push(descriptor.batch);
                            Vec::new()
                        })
                        .push(*descriptor);
                }
                order
                    .into_iter()
                    .filter_map(|batch| groups.remove(&batch))
                    .collect()
            }
        }
    }
}
