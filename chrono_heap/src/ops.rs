//! Container-level get/set (§4.8) and the ref/unref write barrier that keeps
//! string and container refcounts consistent with what a persistent
//! container actually reaches.

use chrono_values::{StringCache, Value};

use crate::error::{HeapError, Result};
use crate::gc::GcColor;
use crate::heap::{Container, ContainerHeap};

/// Reference-counts `value` if it points into the heap, mirroring the
/// original's uniform `ref` dispatch over the tagged `Value` union.
pub fn ref_value(value: Value, heap: &mut ContainerHeap, strings: &mut StringCache) {
    match value {
        Value::String(idx) => strings.ref_(idx),
        Value::Object(idx) | Value::List(idx) => heap.ref_(idx, strings),
        _ => {}
    }
}

/// The `unref` counterpart of [`ref_value`].
pub fn unref_value(value: Value, heap: &mut ContainerHeap, strings: &mut StringCache) {
    match value {
        Value::String(idx) => strings.unref(idx),
        Value::Object(idx) | Value::List(idx) => heap.unref(idx),
        _ => {}
    }
}

/// `Container_Get` (§4.8): objects are keyed by string, lists by
/// non-negative in-bounds integer index.
pub fn get(container: &Container, strings: &StringCache, key: Value) -> Result<Value> {
    match container {
        Container::Object(obj) => {
            let Value::String(key) = key else {
                return Err(HeapError::NonStringObjectKey);
            };
            obj.get(strings, key).copied().ok_or_else(|| {
                HeapError::MissingMember(String::from_utf8_lossy(strings.get(key)).into_owned())
            })
        }
        Container::List(list) => {
            let index = list_index(key, list.len())?;
            Ok(*list.get(index).expect("index already range-checked"))
        }
    }
}

/// `Container_Set` (§4.8): performs the write and applies the GC write
/// barrier — ref the incoming value, unref whatever it displaced, and push
/// the parent gray again if it's black and the new value is a white
/// container (so a completed mark pass doesn't miss a freshly-attached
/// subgraph).
pub fn set(
    heap: &mut ContainerHeap,
    strings: &mut StringCache,
    parent: u32,
    key: Value,
    value: Value,
) -> Result<()> {
    let parent_persistent = heap.is_persistent(parent);
    let parent_color = heap.color(parent);

    let previous = {
        let container = heap.get_mut(parent);
        match container {
            Container::Object(obj) => {
                let Value::String(key_index) = key else {
                    return Err(HeapError::NonStringObjectKey);
                };
                if parent_persistent {
                    strings.ref_(key_index);
                }
                obj.set(strings, key_index, value)
            }
            Container::List(list) => {
                let index = list_index(key, list.len())?;
                list.set(index, value)
            }
        }
    };

    if parent_persistent {
        ref_value(value, heap, strings);
        if let Some(previous) = previous {
            unref_value(previous, heap, strings);
        }
    }

    if parent_color == GcColor::Black {
        if let Some(child) = value.as_heap_index() {
            if heap.color(child) == GcColor::White {
                heap.push_gray(child);
            }
        }
    }

    Ok(())
}

/// `List_Append` (§4.8): grows the list by one, applying the same write
/// barrier as `set` for the newly stored value.
pub fn push(heap: &mut ContainerHeap, strings: &mut StringCache, parent: u32, value: Value) {
    let parent_persistent = heap.is_persistent(parent);
    let parent_color = heap.color(parent);

    let container = heap.get_mut(parent);
    let Container::List(list) = container else {
        panic!("push on a non-list container");
    };
    list.push(value);

    if parent_persistent {
        ref_value(value, heap, strings);
    }

    if parent_color == GcColor::Black {
        if let Some(child) = value.as_heap_index() {
            if heap.color(child) == GcColor::White {
                heap.push_gray(child);
            }
        }
    }
}

fn list_index(key: Value, len: usize) -> Result<usize> {
    let Value::Integer(i) = key else {
        return Err(HeapError::InvalidListIndex);
    };
    if i < 0 || i as usize >= len {
        return Err(HeapError::IndexOutOfRange { index: i as i64, length: len });
    }
    Ok(i as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::ContainerHeap;

    #[test]
    fn set_on_persistent_object_refs_new_value_and_unrefs_old() {
        let mut strings = StringCache::new();
        let mut heap = ContainerHeap::new();
        let parent = heap.pop_object();
        heap.ref_(parent, &mut strings);

        let key = strings.pop_persistent(b"name");
        let child = heap.pop_object();

        set(&mut heap, &mut strings, parent, Value::String(key), Value::Object(child)).unwrap();
        assert_eq!(heap.refcount(child), 1);

        let child2 = heap.pop_object();
        set(&mut heap, &mut strings, parent, Value::String(key), Value::Object(child2)).unwrap();
        assert_eq!(heap.refcount(child), 0);
        assert_eq!(heap.refcount(child2), 1);
    }

    #[test]
    fn list_index_rejects_out_of_range() {
        let mut strings = StringCache::new();
        let mut heap = ContainerHeap::new();
        let parent = heap.pop_list();
        push(&mut heap, &mut strings, parent, Value::Integer(1));
        let container = heap.get(parent);
        let err = get(container, &strings, Value::Integer(5)).unwrap_err();
        assert_eq!(err, HeapError::IndexOutOfRange { index: 5, length: 1 });
    }

    #[test]
    fn object_get_missing_key_reports_name() {
        let mut strings = StringCache::new();
        let heap = ContainerHeap::new();
        let obj = crate::object::ScriptObject::new();
        let container = Container::Object(obj);
        let key = strings.pop_persistent(b"missing");
        let err = get(&container, &strings, Value::String(key)).unwrap_err();
        assert_eq!(err, HeapError::MissingMember("missing".to_string()));
        drop(heap);
    }
}
