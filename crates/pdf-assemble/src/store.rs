//! Open sources, owned by id
//!
//! The store holds the only strong references to its sources. Plans keep weak
//! handles, so closing a source here makes every plan that still references
//! it fail with [`AssembleError::StaleSource`](crate::AssembleError::StaleSource).

use crate::source::{PageSource, SourceId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SourceStore {
    sources: HashMap<SourceId, Arc<PageSource>>,
}

impl SourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `source` and return a shared handle to it
    pub fn insert(&mut self, source: PageSource) -> Arc<PageSource> {
        let source = Arc::new(source);
        log::debug!("Opened source {} ({})", source.id(), source.name());
        self.sources.insert(source.id(), Arc::clone(&source));
        source
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<PageSource>> {
        self.sources.get(&id).cloned()
    }

    /// Drop the store's reference; returns false if `id` was not open
    pub fn close(&mut self, id: SourceId) -> bool {
        let closed = self.sources.remove(&id).is_some();
        if closed {
            log::debug!("Closed source {}", id);
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
