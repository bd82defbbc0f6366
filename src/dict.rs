//! Namespaced key lookup.
//!
//! `keys_sequences` and `keys_vars` are both instances of this type: a
//! `(name, namespace) -> index` map. Namespace 0 in `keys_sequences` holds
//! the namespace-name table itself; `keys_vars` uses fixed namespace ids
//! for `VARIABLE`, `SECTION` and `ITERATION`. `IndexMap` keeps insertion
//! order, which is incidental here but matches the append-only character
//! of the rest of the model.

use indexmap::IndexMap;

#[derive(Debug, Default, Clone)]
pub struct Dict {
    map: IndexMap<(String, u32), u64>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, key: &str, namespace: u32) -> Option<u64> {
        self.map.get(&(key.to_string(), namespace)).copied()
    }

    pub fn write(&mut self, key: &str, namespace: u32, value: u64) {
        self.map.insert((key.to_string(), namespace), value);
    }

    pub fn erase(&mut self, key: &str, namespace: u32) {
        self.map.shift_remove(&(key.to_string(), namespace));
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_do_not_collide() {
        let mut d = Dict::new();
        d.write("name", 1, 10);
        d.write("name", 2, 20);
        assert_eq!(d.find("name", 1), Some(10));
        assert_eq!(d.find("name", 2), Some(20));
    }

    #[test]
    fn write_overwrites_existing_key() {
        let mut d = Dict::new();
        d.write("k", 0, 1);
        d.write("k", 0, 2);
        assert_eq!(d.find("k", 0), Some(2));
    }

    #[test]
    fn erase_removes_only_the_matching_namespace() {
        let mut d = Dict::new();
        d.write("k", 1, 1);
        d.write("k", 2, 2);
        d.erase("k", 1);
        assert_eq!(d.find("k", 1), None);
        assert_eq!(d.find("k", 2), Some(2));
    }
}
