//! Fixed-capacity retention buffer.
//!
//! A ring of `capacity` slots with a write cursor. Inserts always land on the
//! cursor slot, overwriting whatever entry was there, so the oldest entry is
//! the one replaced once the ring is full. Sweeps empty slots in place; since
//! entries are written in arrival order, swept slots are always the ones the
//! cursor reaches next.

use crate::audit::entry::{AuditEntry, EntryRef};

#[derive(Debug)]
pub struct RetentionBuffer {
    slots: Vec<Option<AuditEntry>>,
    cursor: usize,
    len: usize,
    next_id: u64,
}

impl RetentionBuffer {
    /// Create an empty buffer. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            cursor: 0,
            len: 0,
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store an entry, assigning its id. Returns the handle for finalization.
    pub fn insert(&mut self, mut entry: AuditEntry) -> EntryRef {
        let id = self.next_id;
        self.next_id += 1;
        entry.id = id;

        let slot = self.cursor;
        if self.slots[slot].replace(entry).is_none() {
            self.len += 1;
        }
        self.cursor = (self.cursor + 1) % self.slots.len();

        EntryRef { slot, id }
    }

    /// Record the response for the entry behind `entry_ref`.
    ///
    /// Does nothing if the entry was evicted, replaced, or already finalized.
    /// Returns whether the entry was updated.
    pub fn finalize(&mut self, entry_ref: EntryRef, status_code: u16, duration_ms: u64) -> bool {
        if entry_ref.is_detached() {
            return false;
        }
        match self.slots.get_mut(entry_ref.slot) {
            Some(Some(entry)) if entry.id == entry_ref.id && !entry.is_finalized() => {
                entry.status_code = Some(status_code);
                entry.duration_ms = Some(duration_ms);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, entry_ref: EntryRef) -> Option<&AuditEntry> {
        match self.slots.get(entry_ref.slot) {
            Some(Some(entry)) if entry.id == entry_ref.id => Some(entry),
            _ => None,
        }
    }

    /// Remove every entry whose age is at least `ttl_ms`. Returns how many were removed.
    pub fn sweep(&mut self, now_ms: u64, ttl_ms: u64) -> usize {
        let mut removed = 0;
        for slot in self.slots.iter_mut() {
            let expired = matches!(slot, Some(entry) if now_ms.saturating_sub(entry.timestamp_ms) >= ttl_ms);
            if expired {
                *slot = None;
                removed += 1;
            }
        }
        self.len -= removed;
        removed
    }

    /// Drop all entries and rewind the cursor. Ids keep increasing.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.cursor = 0;
        self.len = 0;
    }

    /// Entries in insertion order, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AuditEntry> {
        let (tail, head) = self.slots.split_at(self.cursor);
        head.iter().chain(tail.iter()).filter_map(Option::as_ref)
    }

    /// Cloned entries, oldest first.
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{HeaderSnapshot, SessionSnapshot};

    fn entry(path: &str, timestamp_ms: u64) -> AuditEntry {
        AuditEntry {
            id: 0,
            timestamp_ms,
            client_id: "10.0.0.1".into(),
            method: "GET".into(),
            path: path.into(),
            status_code: None,
            abnormal: false,
            rate_limited: false,
            fingerprint: String::new(),
            session: SessionSnapshot::default(),
            headers: HeaderSnapshot::new(None, None, None),
            body_size: 0,
            duration_ms: None,
            request_id: None,
        }
    }

    fn paths(buffer: &RetentionBuffer) -> Vec<String> {
        buffer.iter().map(|e| e.path.clone()).collect()
    }

    #[test]
    fn test_fills_then_wraps() {
        let mut buffer = RetentionBuffer::new(3);
        for i in 0..5 {
            buffer.insert(entry(&format!("/{i}"), i));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(paths(&buffer), vec!["/2", "/3", "/4"]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = RetentionBuffer::new(4);
        for i in 0..100 {
            buffer.insert(entry("/x", i));
            assert!(buffer.len() <= 4);
        }
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut buffer = RetentionBuffer::new(2);
        let a = buffer.insert(entry("/a", 0));
        let b = buffer.insert(entry("/b", 0));
        assert_eq!((a.id(), b.id()), (1, 2));
        assert_eq!(buffer.get(b).unwrap().id, 2);
    }

    #[test]
    fn test_finalize_once() {
        let mut buffer = RetentionBuffer::new(2);
        let r = buffer.insert(entry("/a", 0));
        assert!(buffer.finalize(r, 200, 12));
        assert!(!buffer.finalize(r, 500, 99));

        let stored = buffer.get(r).unwrap();
        assert_eq!(stored.status_code, Some(200));
        assert_eq!(stored.duration_ms, Some(12));
    }

    #[test]
    fn test_finalize_after_overwrite_leaves_new_entry_alone() {
        let mut buffer = RetentionBuffer::new(1);
        let old = buffer.insert(entry("/old", 0));
        let new = buffer.insert(entry("/new", 1));

        assert!(!buffer.finalize(old, 200, 5));
        let stored = buffer.get(new).unwrap();
        assert_eq!(stored.path, "/new");
        assert_eq!(stored.status_code, None);
    }

    #[test]
    fn test_finalize_detached_is_noop() {
        let mut buffer = RetentionBuffer::new(1);
        buffer.insert(entry("/a", 0));
        assert!(!buffer.finalize(EntryRef::detached(), 200, 1));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut buffer = RetentionBuffer::new(5);
        buffer.insert(entry("/old", 0));
        buffer.insert(entry("/edge", 100));
        buffer.insert(entry("/fresh", 101));

        assert_eq!(buffer.sweep(1_100, 1_000), 2);
        assert_eq!(paths(&buffer), vec!["/fresh"]);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_insert_after_sweep_reuses_emptied_slots() {
        let mut buffer = RetentionBuffer::new(3);
        for i in 0..3 {
            buffer.insert(entry(&format!("/{i}"), i));
        }
        buffer.sweep(1_001, 1_000);
        assert_eq!(paths(&buffer), vec!["/2"]);

        buffer.insert(entry("/3", 1_001));
        buffer.insert(entry("/4", 1_002));
        assert_eq!(buffer.len(), 3);
        assert_eq!(paths(&buffer), vec!["/2", "/3", "/4"]);

        buffer.insert(entry("/5", 1_003));
        assert_eq!(paths(&buffer), vec!["/3", "/4", "/5"]);
    }

    #[test]
    fn test_clear_resets_but_keeps_ids_moving() {
        let mut buffer = RetentionBuffer::new(2);
        let stale = buffer.insert(entry("/a", 0));
        buffer.clear();
        assert!(buffer.is_empty());

        let fresh = buffer.insert(entry("/b", 0));
        assert_eq!(fresh.slot, stale.slot);
        assert_ne!(fresh.id(), stale.id());
        assert!(!buffer.finalize(stale, 200, 1));
    }
}
