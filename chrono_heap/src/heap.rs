use chrono_values::StringCache;

use crate::gc::GcColor;
use crate::list::ScriptList;
use crate::object::ScriptObject;

/// The two container kinds the heap can hold; both are addressed by the same
/// dense index space (§3).
#[derive(Debug, Clone)]
pub enum Container {
    Object(ScriptObject),
    List(ScriptList),
}

impl Container {
    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            Container::Object(o) => Some(o),
            Container::List(_) => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ScriptObject> {
        match self {
            Container::Object(o) => Some(o),
            Container::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ScriptList> {
        match self {
            Container::List(l) => Some(l),
            Container::Object(_) => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ScriptList> {
        match self {
            Container::List(l) => Some(l),
            Container::Object(_) => None,
        }
    }

    fn child_values(&self) -> Vec<chrono_values::Value> {
        match self {
            Container::Object(o) => o.entries().map(|(_, v)| *v).collect(),
            Container::List(l) => l.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    container: Container,
    color: GcColor,
    refcount: u32,
    persistent: bool,
}

/// C2: the dense container heap shared by every `Object`/`List` value.
#[derive(Debug, Default)]
pub struct ContainerHeap {
    slots: Vec<Option<Slot>>,
    free_list: Vec<u32>,
    temp_refs: Vec<u32>,
    gray_stack: Vec<u32>,
}

impl ContainerHeap {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, container: Container) -> u32 {
        let slot = Slot { container, color: GcColor::White, refcount: 0, persistent: false };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            (self.slots.len() - 1) as u32
        };
        self.temp_refs.push(idx);
        idx
    }

    pub fn pop_object(&mut self) -> u32 {
        self.alloc(Container::Object(ScriptObject::new()))
    }

    pub fn pop_list(&mut self) -> u32 {
        self.alloc(Container::List(ScriptList::new()))
    }

    pub fn get(&self, index: u32) -> &Container {
        self.slot(index)
    }

    pub fn get_mut(&mut self, index: u32) -> &mut Container {
        self.slot_mut(index)
    }

    pub fn is_persistent(&self, index: u32) -> bool {
        self.slot_ref(index).persistent
    }

    pub fn color(&self, index: u32) -> GcColor {
        self.slot_ref(index).color
    }

    pub fn refcount(&self, index: u32) -> u32 {
        self.slot_ref(index).refcount
    }

    /// Promotes a container (and, recursively, its current children) from
    /// temporary to persistent. Idempotent; the sticky flag is set before
    /// recursing so reference cycles terminate (§3 invariant, mirroring the
    /// original `makePersistent`).
    pub fn make_persistent(&mut self, index: u32, strings: &mut StringCache) {
        if self.slot_ref(index).persistent {
            return;
        }
        self.slot_full_mut(index).persistent = true;
        let children = self.slot_ref(index).container.child_values();
        for child in children {
            crate::ops::ref_value(child, self, strings);
        }
    }

    /// Equivalent of `ObjectHeap_Ref`: promotes to persistent on first call,
    /// then increments the refcount.
    pub fn ref_(&mut self, index: u32, strings: &mut StringCache) {
        self.make_persistent(index, strings);
        self.slot_full_mut(index).refcount += 1;
    }

    /// Decrements the refcount and re-enrolls the slot in the temporary list
    /// so the next `clear_temporary_references` sweep can reclaim it if it's
    /// still at zero (mirrors the original: unref never frees immediately).
    pub fn unref(&mut self, index: u32) {
        let slot = match self.slots[index as usize].as_mut() {
            Some(slot) => slot,
            None => return, // unreffing a freed slot can happen during GC teardown
        };
        debug_assert!(slot.refcount > 0, "unref of already-zero container #{index}");
        slot.refcount -= 1;
        if slot.refcount == 0 {
            self.temp_refs.push(index);
        }
    }

    /// Frees every temporary-list entry whose refcount is zero, or that was
    /// never promoted to persistent — i.e. everything not held by an
    /// outstanding explicit persistent reference (§5 resource discipline).
    pub fn clear_temporary_references(&mut self, strings: &mut StringCache) {
        let pending = std::mem::take(&mut self.temp_refs);
        for index in pending {
            let should_free = match &self.slots[index as usize] {
                Some(slot) => slot.refcount == 0 || !slot.persistent,
                None => false,
            };
            if should_free {
                self.free_container(index, strings);
            }
        }
    }

    fn free_container(&mut self, index: u32, strings: &mut StringCache) {
        let slot = match self.slots[index as usize].take() {
            Some(slot) => slot,
            None => return,
        };
        self.free_list.push(index);
        match slot.container {
            Container::Object(obj) => {
                for (key, value) in obj.entries() {
                    strings.unref(key);
                    if slot.persistent {
                        crate::ops::unref_value(value, self, strings);
                    }
                }
            }
            Container::List(list) => {
                if slot.persistent {
                    for value in list.iter() {
                        crate::ops::unref_value(*value, self, strings);
                    }
                }
            }
        }
    }

    /// Schedules `index` for marking if it is currently white (§4.1 write
    /// barrier, and the host's root-marking entry point).
    pub fn push_gray(&mut self, index: u32) {
        let slot = self.slot_full_mut(index);
        if slot.color == GcColor::White {
            slot.color = GcColor::Gray;
            self.gray_stack.push(index);
        }
    }

    fn process_one_gray(&mut self) {
        let index = self.gray_stack.pop().expect("process_one_gray called on empty stack");
        let children = self.slot_ref(index).container.child_values();
        for child in children {
            if let Some(child_index) = child.as_heap_index() {
                self.push_gray(child_index);
            }
        }
        self.slot_full_mut(index).color = GcColor::Black;
    }

    /// Drains the gray stack (§4.1/§5 "markAll").
    pub fn mark_all(&mut self) {
        while !self.gray_stack.is_empty() {
            self.process_one_gray();
        }
    }

    /// Frees every white container slot (§4.1/§5 "sweep"). Black slots that
    /// survive are left black — a subsequent GC cycle only re-examines
    /// whatever is freshly pushed gray by new root marks, matching the
    /// reference implementation's one-shot-at-shutdown usage (§5).
    pub fn sweep(&mut self, strings: &mut StringCache) {
        debug_assert!(self.gray_stack.is_empty());
        let white: Vec<u32> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Some(slot) if slot.color == GcColor::White => Some(i as u32),
                _ => None,
            })
            .collect();
        for index in white {
            self.free_container(index, strings);
        }
    }

    fn slot(&self, index: u32) -> &Container {
        &self.slot_ref(index).container
    }

    fn slot_mut(&mut self, index: u32) -> &mut Container {
        &mut self.slot_full_mut(index).container
    }

    fn slot_full_mut(&mut self, index: u32) -> &mut Slot {
        self.slots[index as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("use of freed container #{index}"))
    }

    fn slot_ref(&self, index: u32) -> &Slot {
        self.slots[index as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("use of freed container #{index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_values::Value;

    #[test]
    fn unreferenced_temporary_container_is_swept() {
        let mut strings = StringCache::new();
        let mut heap = ContainerHeap::new();
        let idx = heap.pop_list();
        heap.clear_temporary_references(&mut strings);
        let idx2 = heap.pop_list();
        assert_eq!(idx, idx2, "freed slot should be reused");
    }

    #[test]
    fn ref_promotes_and_survives_clear_temporary() {
        let mut strings = StringCache::new();
        let mut heap = ContainerHeap::new();
        let idx = heap.pop_list();
        heap.ref_(idx, &mut strings);
        heap.clear_temporary_references(&mut strings);
        assert!(heap.is_persistent(idx));
        assert_eq!(heap.refcount(idx), 1);
    }

    #[test]
    fn self_referential_cycle_is_collected_by_mark_sweep() {
        // Two persistent objects referencing each other, then both unreffed:
        // a pure refcounting scheme would leak this cycle, so the GC must
        // reclaim it via mark/sweep instead (§5).
        let mut strings = StringCache::new();
        let mut heap = ContainerHeap::new();
        let a = heap.pop_object();
        let b = heap.pop_object();
        heap.ref_(a, &mut strings);
        heap.ref_(b, &mut strings);

        let key = strings.pop_persistent(b"next");
        crate::ops::set(&mut heap, &mut strings, a, Value::String(key), Value::Object(b)).unwrap();
        crate::ops::set(&mut heap, &mut strings, b, Value::String(key), Value::Object(a)).unwrap();

        heap.unref(a);
        heap.unref(b);
        heap.clear_temporary_references(&mut strings);
        // both still alive: their mutual refcounts keep them at 1
        assert_eq!(heap.refcount(a), 1);
        assert_eq!(heap.refcount(b), 1);

        // no external roots pushed gray: both stay white through the cycle
        heap.mark_all();
        heap.sweep(&mut strings);
        let reused = heap.pop_object();
        assert!(reused == a || reused == b, "cycle should have been swept");
    }

    #[test]
    fn three_object_cycle_is_collected_by_mark_sweep() {
        // a -> b -> c -> a, every edge persistent, no external roots pushed
        // gray after the last unref: mark/sweep must free all three in one
        // pass, not just a pairwise cycle (§8 scenario 6).
        let mut strings = StringCache::new();
        let mut heap = ContainerHeap::new();
        let a = heap.pop_object();
        let b = heap.pop_object();
        let c = heap.pop_object();
        heap.ref_(a, &mut strings);
        heap.ref_(b, &mut strings);
        heap.ref_(c, &mut strings);

        let key = strings.pop_persistent(b"next");
        crate::ops::set(&mut heap, &mut strings, a, Value::String(key), Value::Object(b)).unwrap();
        crate::ops::set(&mut heap, &mut strings, b, Value::String(key), Value::Object(c)).unwrap();
        crate::ops::set(&mut heap, &mut strings, c, Value::String(key), Value::Object(a)).unwrap();

        heap.unref(a);
        heap.unref(b);
        heap.unref(c);
        heap.clear_temporary_references(&mut strings);
        assert_eq!(heap.refcount(a), 1);
        assert_eq!(heap.refcount(b), 1);
        assert_eq!(heap.refcount(c), 1);

        heap.mark_all();
        heap.sweep(&mut strings);

        let first = heap.pop_object();
        let second = heap.pop_object();
        let third = heap.pop_object();
        let reused = [first, second, third];
        assert!(reused.contains(&a) && reused.contains(&b) && reused.contains(&c));
    }

    #[test]
    fn standalone_persistent_object_is_freed_by_refcount_alone() {
        // A persistent object with no cycle: dropping its one outstanding
        // reference must free it on `clear_temporary_references` without
        // ever needing a `mark_all`/`sweep` pass (§8 scenario 6, second
        // clause: pure refcounting is sufficient for acyclic data).
        let mut strings = StringCache::new();
        let mut heap = ContainerHeap::new();
        let obj = heap.pop_object();
        heap.ref_(obj, &mut strings);
        heap.clear_temporary_references(&mut strings);
        assert!(heap.is_persistent(obj));

        heap.unref(obj);
        heap.clear_temporary_references(&mut strings);

        let reused = heap.pop_object();
        assert_eq!(reused, obj, "acyclic container should be freed by refcounting alone");
    }
}
