use hashbrown::HashMap;

/// One entry of the string cache (§3 "String cache").
#[derive(Debug, Clone)]
struct StringSlot {
    bytes: Vec<u8>,
    refcount: u32,
    persistent: bool,
    hash: u64,
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    bytes.iter().fold(OFFSET, |h, b| (h ^ *b as u64).wrapping_mul(PRIME))
}

/// Content-addressable, refcounted, dense-indexed string cache.
///
/// Mirrors the original `StrCache`: a `pop`/`ref`/`unref`/`clearTemporary`
/// lifecycle where every allocation starts out enrolled in a temporary list
/// and is only actually freed when `clear_temporary` sweeps it, unless it has
/// been promoted to a persistent (refcounted-forever) slot first.
#[derive(Debug, Default)]
pub struct StringCache {
    slots: Vec<Option<StringSlot>>,
    free_list: Vec<u32>,
    temp_refs: Vec<u32>,
    intern: HashMap<Vec<u8>, u32>,
}

impl StringCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_slot(&mut self, bytes: Vec<u8>, refcount: u32, persistent: bool) -> u32 {
        let hash = fnv1a(&bytes);
        let slot = StringSlot { bytes, refcount, persistent, hash };
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            (self.slots.len() - 1) as u32
        }
    }

    /// `pop(len)`: allocate a fresh, zero-filled, refcount-0 slot and enroll
    /// it in the temporary list.
    pub fn pop(&mut self, len: usize) -> u32 {
        let idx = self.alloc_slot(vec![0u8; len], 0, false);
        self.temp_refs.push(idx);
        idx
    }

    /// `popPersistent`: returns a slot already at refcount 1, never enrolled
    /// in the temporary list, so constant-folding outputs survive the
    /// compile (§3).
    pub fn pop_persistent(&mut self, bytes: &[u8]) -> u32 {
        if let Some(&idx) = self.intern.get(bytes) {
            self.ref_(idx);
            return idx;
        }
        let idx = self.alloc_slot(bytes.to_vec(), 1, true);
        self.intern.insert(bytes.to_vec(), idx);
        idx
    }

    /// Compile-time duplicate lookup ("content-addressable during
    /// construction").
    pub fn find_string(&self, bytes: &[u8]) -> Option<u32> {
        self.intern.get(bytes).copied()
    }

    pub fn set_bytes(&mut self, index: u32, bytes: Vec<u8>) {
        let slot = self.slot_mut(index);
        slot.hash = fnv1a(&bytes);
        slot.bytes = bytes;
    }

    pub fn get(&self, index: u32) -> &[u8] {
        &self.slot(index).bytes
    }

    pub fn len(&self, index: u32) -> usize {
        self.slot(index).bytes.len()
    }

    pub fn hash(&self, index: u32) -> u64 {
        self.slot(index).hash
    }

    pub fn is_persistent(&self, index: u32) -> bool {
        self.slot(index).persistent
    }

    pub fn refcount(&self, index: u32) -> u32 {
        self.slot(index).refcount
    }

    /// Increments a string's reference count.
    pub fn ref_(&mut self, index: u32) {
        self.slot_mut(index).refcount += 1;
    }

    /// Decrements a string's reference count. Mirrors the original: unref
    /// never frees a slot immediately, even a persistent one at refcount
    /// zero — it only re-enrolls the slot in the temporary list, and actual
    /// reclamation happens solely in `clear_temporary`.
    pub fn unref(&mut self, index: u32) {
        let slot = self.slot_mut(index);
        debug_assert!(slot.refcount > 0, "unref of already-zero string #{index}");
        slot.refcount -= 1;
        if slot.refcount == 0 {
            self.temp_refs.push(index);
        }
    }

    /// Promotes a temporary slot to persistent without changing its
    /// refcount accounting beyond ensuring it owns one persistent reference.
    /// Used by the interpreter (§4.5) when a top-level call returns a
    /// `String`, since every temporary slot is about to be swept.
    pub fn promote_to_persistent(&mut self, index: u32) {
        let slot = self.slot_mut(index);
        if !slot.persistent {
            slot.persistent = true;
            slot.refcount = slot.refcount.max(1);
        }
    }

    /// Frees every enrolled zero-refcount slot. Slots added to the temporary
    /// list twice are handled gracefully (the second visit finds the slot
    /// already freed).
    pub fn clear_temporary(&mut self) {
        let pending = std::mem::take(&mut self.temp_refs);
        for index in pending {
            let is_zero_and_live =
                matches!(&self.slots[index as usize], Some(slot) if slot.refcount == 0);
            if is_zero_and_live {
                self.free_slot(index);
            }
        }
    }

    fn free_slot(&mut self, index: u32) {
        if let Some(slot) = self.slots[index as usize].take() {
            if slot.persistent {
                // Drop the dedup entry only if it still points at this slot —
                // a later `pop_persistent` of the same bytes may already have
                // re-interned under a different index.
                if self.intern.get(&slot.bytes) == Some(&index) {
                    self.intern.remove(&slot.bytes);
                }
            }
            self.free_list.push(index);
        }
    }

    fn slot(&self, index: u32) -> &StringSlot {
        self.slots[index as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("use of freed string #{index}"))
    }

    fn slot_mut(&mut self, index: u32) -> &mut StringSlot {
        self.slots[index as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("use of freed string #{index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pop_then_clear_temporary_frees_zero_refcount_slots() {
        let mut cache = StringCache::new();
        let idx = cache.pop(3);
        cache.set_bytes(idx, b"abc".to_vec());
        assert_eq!(cache.get(idx), b"abc");
        cache.clear_temporary();
        // slot reused on next pop since it was freed
        let idx2 = cache.pop(1);
        assert_eq!(idx2, idx);
    }

    #[test]
    fn ref_keeps_a_slot_alive_across_clear_temporary() {
        let mut cache = StringCache::new();
        let idx = cache.pop(3);
        cache.set_bytes(idx, b"abc".to_vec());
        cache.ref_(idx);
        cache.clear_temporary();
        assert_eq!(cache.get(idx), b"abc");
        cache.unref(idx);
        cache.clear_temporary();
        let idx2 = cache.pop(1);
        assert_eq!(idx2, idx);
    }

    #[test]
    fn pop_persistent_deduplicates_content() {
        let mut cache = StringCache::new();
        let a = cache.pop_persistent(b"hello");
        let b = cache.pop_persistent(b"hello");
        assert_eq!(a, b);
        assert_eq!(cache.refcount(a), 2);
    }

    #[test]
    fn persistent_slot_frees_on_clear_temporary_after_unref_to_zero() {
        let mut cache = StringCache::new();
        let idx = cache.pop_persistent(b"temp-const");
        assert_eq!(cache.refcount(idx), 1);
        cache.unref(idx);
        // unref alone never frees; the slot is merely re-enrolled.
        assert_eq!(cache.get(idx), b"temp-const");
        cache.clear_temporary();
        let idx2 = cache.pop(1);
        assert_eq!(idx2, idx);
    }

    #[test]
    fn promote_to_persistent_survives_sweep() {
        let mut cache = StringCache::new();
        let idx = cache.pop(4);
        cache.set_bytes(idx, b"ret0".to_vec());
        cache.promote_to_persistent(idx);
        cache.clear_temporary();
        assert_eq!(cache.get(idx), b"ret0");
    }

    proptest! {
        /// Content-addressing invariant (§3 "String cache"): any two
        /// `pop_persistent` calls with equal byte content always return the
        /// same index, and its stored bytes always round-trip unchanged,
        /// regardless of what the bytes happen to be.
        #[test]
        fn pop_persistent_is_content_addressed(bytes: Vec<u8>) {
            let mut cache = StringCache::new();
            let first = cache.pop_persistent(&bytes);
            let second = cache.pop_persistent(&bytes);
            prop_assert_eq!(first, second);
            prop_assert_eq!(cache.get(first), bytes.as_slice());
            prop_assert_eq!(cache.refcount(first), 2);
        }

        /// `pop`/`set_bytes`/`get` round-trips any byte sequence of the
        /// length it was `pop`-ed with.
        #[test]
        fn pop_then_set_bytes_round_trips(bytes: Vec<u8>) {
            let mut cache = StringCache::new();
            let idx = cache.pop(bytes.len());
            cache.set_bytes(idx, bytes.clone());
            prop_assert_eq!(cache.get(idx), bytes.as_slice());
        }
    }
}
