//! Ordered key-value record.
//!
//! Entries live in a slot arena threaded into a doubly-linked list, with a
//! hash index from key to slot. Lookup is average O(1) and every positional
//! operation (unlink, move to either end, insert after, rename in place) is
//! O(1) plus index maintenance. Keys are unique: `put` on an existing key
//! overwrites the value where it stands.

use std::collections::HashMap;
use std::fmt;

use crate::value::Value;

/// Separator used when joining keys or grouping values into one string.
pub const GROUP_SEPARATOR: char = '\u{1f}';

#[derive(Clone)]
struct Slot {
    key: String,
    value: Value,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A record: a unique-keyed map that remembers field order.
#[derive(Clone, Default)]
pub struct Record {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.slot(i).value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let i = *self.index.get(key)?;
        Some(&mut self.slot_mut(i).value)
    }

    /// Overwrite in place if `key` exists, else append at the end.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(&i) = self.index.get(&key) {
            self.slot_mut(i).value = value;
            return;
        }
        let i = self.allocate(key, value);
        self.link_back(i);
    }

    /// Overwrite in place if `key` exists, else insert at the front.
    pub fn prepend(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(&i) = self.index.get(&key) {
            self.slot_mut(i).value = value;
            return;
        }
        let i = self.allocate(key, value);
        self.link_front(i);
    }

    /// Insert `key` right after `anchor`. If `key` already exists it is moved
    /// there with the new value. Appends when `anchor` is missing.
    pub fn insert_after(&mut self, anchor: &str, key: impl Into<String>, value: Value) {
        let key = key.into();
        if key == anchor {
            self.put(key, value);
            return;
        }
        let i = match self.index.get(&key) {
            Some(&i) => {
                self.detach(i);
                self.slot_mut(i).value = value;
                i
            }
            None => self.allocate(key, value),
        };
        match self.index.get(anchor).copied() {
            Some(a) => {
                let after = self.slot(a).next;
                {
                    let slot = self.slot_mut(i);
                    slot.prev = Some(a);
                    slot.next = after;
                }
                self.slot_mut(a).next = Some(i);
                match after {
                    Some(n) => self.slot_mut(n).prev = Some(i),
                    None => self.tail = Some(i),
                }
            }
            None => self.link_back(i),
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        self.detach(i);
        let slot = self.slots[i].take()?;
        self.free.push(i);
        Some(slot.value)
    }

    /// Remove `key` without returning it.
    pub fn unlink(&mut self, key: &str) {
        self.remove(key);
    }

    pub fn move_to_front(&mut self, key: &str) {
        if let Some(&i) = self.index.get(key) {
            self.detach(i);
            self.link_front(i);
        }
    }

    pub fn move_to_back(&mut self, key: &str) {
        if let Some(&i) = self.index.get(key) {
            self.detach(i);
            self.link_back(i);
        }
    }

    /// Rename `old` to `new` in place. If `new` already exists elsewhere that
    /// entry is dropped, so the record stays duplicate-free.
    pub fn rename(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        let Some(i) = self.index.remove(old) else {
            return;
        };
        if self.has(new) {
            self.unlink(new);
        }
        self.slot_mut(i).key = new.to_string();
        self.index.insert(new.to_string(), i);
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            record: self,
            cursor: self.head,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.iter().map(|(_, v)| v)
    }

    /// Key names joined by commas: the schema fingerprint used by
    /// `group-like` and format writers to detect schema changes.
    pub fn joined_keys(&self) -> String {
        self.keys().collect::<Vec<_>>().join(",")
    }

    /// The values of `fields`, joined into one grouping key. `None` when any
    /// field is missing or empty.
    pub fn grouping_key(&self, fields: &[String]) -> Option<String> {
        let mut key = String::new();
        for (n, field) in fields.iter().enumerate() {
            let value = self.get(field)?;
            let text = value.to_string();
            if text.is_empty() {
                return None;
            }
            if n > 0 {
                key.push(GROUP_SEPARATOR);
            }
            key.push_str(&text);
        }
        Some(key)
    }

    /// The values of `fields`, in order. `None` when any field is missing.
    pub fn selected_values(&self, fields: &[String]) -> Option<Vec<Value>> {
        fields.iter().map(|f| self.get(f).cloned()).collect()
    }

    /// Reorder entries lexically by key, ascending or descending.
    pub fn sort_keys(&mut self, descending: bool) {
        let mut order: Vec<usize> = self.slot_order();
        order.sort_by(|&a, &b| {
            let ord = self.slot(a).key.cmp(&self.slot(b).key);
            if descending { ord.reverse() } else { ord }
        });
        self.relink(&order);
    }

    /// Keep only the entries whose key satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        let doomed: Vec<String> = self
            .iter()
            .filter(|(k, v)| !keep(k, v))
            .map(|(k, _)| k.to_string())
            .collect();
        for key in doomed {
            self.unlink(&key);
        }
    }

    fn slot_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(i) = cursor {
            order.push(i);
            cursor = self.slot(i).next;
        }
        order
    }

    fn relink(&mut self, order: &[usize]) {
        self.head = order.first().copied();
        self.tail = order.last().copied();
        for (n, &i) in order.iter().enumerate() {
            let prev = if n == 0 { None } else { Some(order[n - 1]) };
            let next = order.get(n + 1).copied();
            let slot = self.slot_mut(i);
            slot.prev = prev;
            slot.next = next;
        }
    }

    fn allocate(&mut self, key: String, value: Value) -> usize {
        let slot = Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let i = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, i);
        i
    }

    fn link_back(&mut self, i: usize) {
        let old_tail = self.tail;
        {
            let slot = self.slot_mut(i);
            slot.prev = old_tail;
            slot.next = None;
        }
        match old_tail {
            Some(t) => self.slot_mut(t).next = Some(i),
            None => self.head = Some(i),
        }
        self.tail = Some(i);
    }

    fn link_front(&mut self, i: usize) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(i);
            slot.prev = None;
            slot.next = old_head;
        }
        match old_head {
            Some(h) => self.slot_mut(h).prev = Some(i),
            None => self.tail = Some(i),
        }
        self.head = Some(i);
    }

    fn detach(&mut self, i: usize) {
        let (prev, next) = {
            let slot = self.slot(i);
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let slot = self.slot_mut(i);
        slot.prev = None;
        slot.next = None;
    }

    fn slot(&self, i: usize) -> &Slot {
        match &self.slots[i] {
            Some(slot) => slot,
            None => panic!("internal coding error: record slot {i} is free"),
        }
    }

    fn slot_mut(&mut self, i: usize) -> &mut Slot {
        match &mut self.slots[i] {
            Some(slot) => slot,
            None => panic!("internal coding error: record slot {i} is free"),
        }
    }
}

/// Iterator over `(key, value)` pairs in record order.
pub struct Iter<'a> {
    record: &'a Record,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.record.slot(self.cursor?);
        self.cursor = slot.next;
        Some((&slot.key, &slot.value))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a str, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.put(k, v);
        }
        record
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// DKVP rendering, handy in tests and diagnostics.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, (k, v)) in self.iter().enumerate() {
            if n > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}
