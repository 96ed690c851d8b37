//! Object storage for one output document

use lopdf::{Object, ObjectId};
use std::collections::{BTreeMap, HashMap};

/// Maps object ids of a source document to ids already copied into a pool
pub type CopyCache = HashMap<ObjectId, ObjectId>;

/// Fresh object id space that resolved pages copy their resources into.
///
/// Ids are allocated densely from 1 so that encoding the same plan twice
/// produces the same object numbering.
#[derive(Debug, Clone, Default)]
pub struct ObjectPool {
    objects: BTreeMap<ObjectId, Object>,
    max_id: u32,
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id without storing anything under it yet
    pub fn reserve(&mut self) -> ObjectId {
        self.max_id += 1;
        (self.max_id, 0)
    }

    pub fn insert(&mut self, id: ObjectId, object: Object) {
        self.max_id = self.max_id.max(id.0);
        self.objects.insert(id, object);
    }

    pub fn add(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = self.reserve();
        self.objects.insert(id, object.into());
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<ObjectId, Object>, u32) {
        (self.objects, self.max_id)
    }
}
