//! Ordered, duplicate-tolerant metadata entry storage shared by the three
//! namespaces.

use crate::key::MetadataKey;
use crate::value::TypedValue;

/// One metadata item.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<K> {
    pub key: K,
    pub value: TypedValue,
}

impl<K> Entry<K> {
    pub fn new(key: K, value: TypedValue) -> Self {
        Self { key, value }
    }
}

/// Entries in stored order. Duplicate keys are allowed; lookups see the
/// first match.
///
/// The store tracks whether it was modified since it was decoded, so the
/// container writer can pass untouched metadata blocks through unchanged.
#[derive(Debug, Clone)]
pub struct Store<K> {
    entries: Vec<Entry<K>>,
    dirty: bool,
}

impl<K> Default for Store<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            dirty: false,
        }
    }
}

impl<K: MetadataKey> Store<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry while decoding. Does not mark the store modified.
    pub fn push(&mut self, key: K, value: TypedValue) {
        self.entries.push(Entry::new(key, value));
    }

    /// First entry whose key equals `key`.
    pub fn find(&self, key: &K) -> Option<&Entry<K>> {
        self.entries.iter().find(|e| e.key == *key)
    }

    /// Replace the value of the first entry with `key`, or append a new
    /// entry. Other duplicates are left untouched.
    pub fn upsert(&mut self, key: K, value: TypedValue) {
        self.dirty = true;
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(Entry::new(key, value)),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<K>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` once the store was changed through its public mutators.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Detach every entry with `key` while decoding and return the first
    /// value. Leaves the modified flag alone.
    pub(crate) fn take(&mut self, key: &K) -> Option<TypedValue> {
        let first = self.entries.iter().position(|e| e.key == *key)?;
        let value = self.entries.remove(first).value;
        self.entries.retain(|e| e.key != *key);
        Some(value)
    }

    /// Called after a successful commit; the container now holds exactly
    /// what this store encodes.
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl<'a, K> IntoIterator for &'a Store<K> {
    type Item = &'a Entry<K>;
    type IntoIter = std::slice::Iter<'a, Entry<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
