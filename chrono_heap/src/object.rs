//! The `Object` container: an open-addressed hash table with Lua/Brent-style
//! displacement (§3), keyed by interned string indices.

use chrono_values::{StringCache, Value};

#[derive(Debug, Clone)]
struct Node {
    key: Option<u32>,
    value: Value,
    next: Option<usize>,
}

impl Node {
    fn empty() -> Self {
        Self { key: None, value: Value::Empty, next: None }
    }
}

/// A hash table mapping interned string indices to `Value`s.
#[derive(Debug, Clone)]
pub struct ScriptObject {
    table: Vec<Node>,
    log2_size: u32,
    last_free: usize,
}

fn ceil_log2(mut x: u32) -> u32 {
    if x <= 1 {
        return 0;
    }
    x -= 1;
    32 - x.leading_zeros()
}

fn keys_equal(strings: &StringCache, key1: u32, key2: u32) -> bool {
    // Most keys are interned string constants, so identity catches the
    // common case; fall back to hash then byte comparison (§3).
    key1 == key2 || (strings.hash(key1) == strings.hash(key2) && strings.get(key1) == strings.get(key2))
}

impl ScriptObject {
    pub fn new() -> Self {
        Self { table: vec![Node::empty()], log2_size: 0, last_free: 1 }
    }

    fn size(&self) -> usize {
        1usize << self.log2_size
    }

    fn main_position(&self, strings: &StringCache, key: u32) -> usize {
        (strings.hash(key) as usize) & (self.size() - 1)
    }

    fn node_index_for_key(&self, strings: &StringCache, key: u32) -> Option<usize> {
        let mut position = self.main_position(strings, key);
        loop {
            let node = &self.table[position];
            match node.key {
                Some(k) if keys_equal(strings, key, k) => return Some(position),
                _ => match node.next {
                    Some(next) => position = next,
                    None => return None,
                },
            }
        }
    }

    pub fn get(&self, strings: &StringCache, key: u32) -> Option<&Value> {
        self.node_index_for_key(strings, key).map(|i| &self.table[i].value)
    }

    pub fn has_key(&self, strings: &StringCache, key: u32) -> bool {
        self.node_index_for_key(strings, key).is_some()
    }

    /// Inserts or overwrites `key → value`. Returns the previous value when
    /// overwriting an existing key (the caller is responsible for unref'ing
    /// it if persistence bookkeeping requires that).
    pub fn set(&mut self, strings: &StringCache, key: u32, value: Value) -> Option<Value> {
        if let Some(index) = self.node_index_for_key(strings, key) {
            return Some(std::mem::replace(&mut self.table[index].value, value));
        }

        let main_index = self.main_position(strings, key);
        if self.table[main_index].key.is_none() {
            self.table[main_index] = Node { key: Some(key), value, next: None };
            return None;
        }

        let free = match self.get_free_position() {
            Some(pos) => pos,
            None => {
                self.resize(strings, self.size() as u32 + 1);
                return self.set(strings, key, value);
            }
        };

        let colliding_key = self.table[main_index].key.unwrap();
        let collider_main = self.main_position(strings, colliding_key);

        if collider_main == main_index {
            // The occupant of the main position belongs there; chain the new
            // entry off it via the free slot.
            let old_next = self.table[main_index].next;
            self.table[free] = Node { key: Some(key), value, next: old_next };
            self.table[main_index].next = Some(free);
        } else {
            // The occupant is itself displaced from elsewhere; relocate it to
            // the free slot and repoint its predecessor, freeing the main
            // position for the new key.
            self.table[free] = self.table[main_index].clone();
            let mut predecessor = collider_main;
            while self.table[predecessor].next != Some(main_index) {
                predecessor = self.table[predecessor].next.expect("broken displacement chain");
            }
            self.table[predecessor].next = Some(free);
            self.table[main_index] = Node { key: Some(key), value, next: None };
        }

        None
    }

    fn get_free_position(&mut self) -> Option<usize> {
        while self.last_free > 0 {
            self.last_free -= 1;
            if self.table[self.last_free].key.is_none() {
                return Some(self.last_free);
            }
        }
        None
    }

    fn resize(&mut self, strings: &StringCache, min_new_size: u32) {
        let old = std::mem::replace(&mut self.table, Vec::new());
        self.log2_size = ceil_log2(min_new_size);
        let new_size = self.size();
        self.table = (0..new_size).map(|_| Node::empty()).collect();
        self.last_free = new_size;
        for node in old.into_iter().rev() {
            if let Some(key) = node.key {
                self.set(strings, key, node.value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.iter().filter(|n| n.key.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.table.iter().filter_map(|n| n.key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, &Value)> {
        self.table.iter().filter_map(|n| n.key.map(|k| (k, &n.value)))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.table.iter_mut().filter(|n| n.key.is_some()).map(|n| &mut n.value)
    }
}

impl Default for ScriptObject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intern(strings: &mut StringCache, s: &str) -> u32 {
        strings.pop_persistent(s.as_bytes())
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut strings = StringCache::new();
        let k = intern(&mut strings, "x");
        let mut obj = ScriptObject::new();
        obj.set(&strings, k, Value::Integer(42));
        assert_eq!(obj.get(&strings, k), Some(&Value::Integer(42)));
    }

    #[test]
    fn overwrite_returns_previous_value() {
        let mut strings = StringCache::new();
        let k = intern(&mut strings, "x");
        let mut obj = ScriptObject::new();
        obj.set(&strings, k, Value::Integer(1));
        let prev = obj.set(&strings, k, Value::Integer(2));
        assert_eq!(prev, Some(Value::Integer(1)));
        assert_eq!(obj.get(&strings, k), Some(&Value::Integer(2)));
    }

    #[test]
    fn many_keys_survive_collisions_and_resizes() {
        let mut strings = StringCache::new();
        let mut obj = ScriptObject::new();
        let keys: Vec<u32> = (0..200)
            .map(|i| intern(&mut strings, &format!("k{i}")))
            .collect();
        for (i, &k) in keys.iter().enumerate() {
            obj.set(&strings, k, Value::Integer(i as i32));
        }
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(obj.get(&strings, k), Some(&Value::Integer(i as i32)));
        }
        assert_eq!(obj.len(), 200);
    }
}
