//! Deep copy of source objects into an output pool

use super::pool::{CopyCache, ObjectPool};
use crate::types::Result;
use lopdf::{Dictionary, Document, Object, Stream};

/// Deep copy an object from a source document into `pool`, following references.
///
/// Every referenced object is copied at most once per cache. The target id is
/// reserved before recursing, so reference cycles (annotations pointing back
/// at their page, for instance) terminate. References to other page tree nodes
/// become `null`: a copied page must never drag its siblings along.
pub fn copy_object_deep(
    pool: &mut ObjectPool,
    source: &Document,
    obj: &Object,
    cache: &mut CopyCache,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            // Check cache first
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            // Dangling references read as null
            let Ok(referenced) = source.get_object(*id) else {
                log::warn!("Dropping dangling reference {:?}", id);
                return Ok(Object::Null);
            };
            if is_page_tree_node(referenced) {
                return Ok(Object::Null);
            }

            let new_id = pool.reserve();
            cache.insert(*id, new_id);
            let copied = copy_object_deep(pool, source, referenced, cache)?;
            pool.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            pool, source, dict, cache,
        )?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(pool, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(pool, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        // Primitive types: just clone
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    pool: &mut ObjectPool,
    source: &Document,
    dict: &Dictionary,
    cache: &mut CopyCache,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), copy_object_deep(pool, source, value, cache)?);
    }
    Ok(new_dict)
}

fn is_page_tree_node(obj: &Object) -> bool {
    match obj.as_dict() {
        Ok(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name.as_slice() == b"Page" || name.as_slice() == b"Pages"
        ),
        Err(_) => false,
    }
}
