//! Document assembly - turning a plan into resolved, encodable documents
//!
//! The assembler walks a plan in order and copies every referenced page out
//! of its source into a fresh object pool:
//! 1. Upgrade every source the plan references (all or nothing)
//! 2. Split the plan into output groups
//! 3. Resolve each page, applying its rotation delta
//! 4. Hand the finished documents to an encoder

mod copy;
mod pool;

pub use copy::copy_object_deep;
pub use pool::{CopyCache, ObjectPool};

use crate::plan::{AssemblyPlan, Grouping, PageDescriptor};
use crate::source::{PageSource, SourceId};
use crate::types::*;
use lopdf::Dictionary;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Raw JPEG data placed on its own page
#[derive(Debug, Clone)]
pub struct ImageData {
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Colour components as stored in the JPEG frame (1, 3 or 4)
    pub components: u8,
}

/// Content of one resolved page
#[derive(Debug, Clone)]
pub enum PageContent {
    /// Page dictionary whose references point into the document's pool
    Pdf { page: Dictionary },
    /// An image that becomes a whole page when encoded
    Image(ImageData),
}

/// Where a resolved page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageOrigin {
    pub source: SourceId,
    pub page_index: usize,
}

/// One page of an assembled document
#[derive(Debug, Clone)]
pub struct AssembledPage {
    pub origin: PageOrigin,
    /// Intrinsic size of the source page
    pub size: PageSize,
    /// Intrinsic rotation plus the plan's delta
    pub rotation: Rotation,
    pub size_override: Option<PageSize>,
    pub content: PageContent,
}

/// Resolved page sequence of one output document, ready for encoding
#[derive(Debug, Clone, Default)]
pub struct AssembledDocument {
    pages: Vec<AssembledPage>,
    pool: ObjectPool,
}

impl AssembledDocument {
    pub fn pages(&self) -> &[AssembledPage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    pub fn into_parts(self) -> (Vec<AssembledPage>, ObjectPool) {
        (self.pages, self.pool)
    }
}

/// Result of assembling a plan, shaped by its grouping
#[derive(Debug, Clone)]
pub enum Assembly {
    Single(AssembledDocument),
    Many(Vec<AssembledDocument>),
}

impl Assembly {
    pub fn into_documents(self) -> Vec<AssembledDocument> {
        match self {
            Assembly::Single(doc) => vec![doc],
            Assembly::Many(docs) => docs,
        }
    }

    pub fn document_count(&self) -> usize {
        match self {
            Assembly::Single(_) => 1,
            Assembly::Many(docs) => docs.len(),
        }
    }
}

/// Cooperative cancellation shared between a caller and a running assembly
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Executes assembly plans against their sources
#[derive(Default)]
pub struct Assembler {
    cancel: Option<CancelFlag>,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for Assembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembler")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `flag` between pages and abort with [`AssembleError::Cancelled`] once set
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Report `(pages done, total pages)` after each resolved page
    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Resolve every page of `plan` in order.
    ///
    /// Fails with [`AssembleError::StaleSource`] before doing any work if a
    /// source the plan references has been dropped. Any failure discards
    /// everything resolved so far.
    pub fn assemble(&self, plan: &AssemblyPlan) -> Result<Assembly> {
        let sources = plan.upgrade_sources()?;
        let total = plan.len();
        let mut done = 0;

        let mut documents = Vec::new();
        for group in plan.groups() {
            documents.push(self.assemble_group(&group, &sources, &mut done, total)?);
        }

        log::info!(
            "Assembled {} page(s) into {} document(s)",
            total,
            documents.len()
        );

        match plan.grouping() {
            Grouping::Single => Ok(Assembly::Single(
                documents.pop().unwrap_or_default(),
            )),
            _ => Ok(Assembly::Many(documents)),
        }
    }

    fn assemble_group(
        &self,
        group: &[PageDescriptor],
        sources: &HashMap<SourceId, Arc<PageSource>>,
        done: &mut usize,
        total: usize,
    ) -> Result<AssembledDocument> {
        let mut pool = ObjectPool::new();
        // One cache per source: object ids are only unique within a source
        let mut caches: HashMap<SourceId, CopyCache> = HashMap::new();
        let mut pages = Vec::with_capacity(group.len());

        for descriptor in group {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                log::info!("Assembly cancelled after {} of {} page(s)", done, total);
                return Err(AssembleError::Cancelled);
            }

            let source = sources
                .get(&descriptor.source())
                .ok_or(AssembleError::StaleSource(descriptor.source()))?;
            let geometry = source.page_geometry(descriptor.page_index())?;
            let cache = caches.entry(descriptor.source()).or_default();
            let content = source.resolve(descriptor.page_index(), &mut pool, cache)?;

            pages.push(AssembledPage {
                origin: PageOrigin {
                    source: descriptor.source(),
                    page_index: descriptor.page_index(),
                },
                size: geometry.size(),
                rotation: geometry.rotation + descriptor.rotation(),
                size_override: descriptor.size_override(),
                content,
            });

            *done += 1;
            if let Some(progress) = &self.progress {
                progress(*done, total);
            }
        }

        Ok(AssembledDocument { pages, pool })
    }
}
