//! Session-lifetime table of discovered access points.
//!
//! Records live in a dense arena in first-seen order; a hashed index maps each
//! BSSID to its slot. Nothing is ever evicted: once `capacity` networks are
//! known, frames for new BSSIDs are dropped until [`NetworkTable::clear`].

use heapless::{FnvIndexMap, Vec};

use crate::classify::Observation;
use crate::types::{Bssid, EncryptionClass, NetworkRecord, Ssid};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { index: usize },
    Updated { index: usize },
    Dropped,
}

/// `N` is the storage size and must be a power of two (index map limit).
pub struct NetworkTable<const N: usize> {
    records: Vec<NetworkRecord, N>,
    index: FnvIndexMap<Bssid, u16, N>,
    capacity: usize,
}

impl<const N: usize> Default for NetworkTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NetworkTable<N> {
    pub fn new() -> Self {
        Self::with_capacity(N)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            index: FnvIndexMap::new(),
            capacity: capacity.min(N),
        }
    }

    /// Inserts or updates from a classified frame. A clipped frame that never
    /// reached the security elements keeps the stored encryption class.
    pub fn observe(&mut self, observation: Observation, now_ms: u64) -> InsertOutcome {
        let encryption = match self.find(&observation.bssid) {
            Some((_, record)) if !observation.encryption_known => record.encryption,
            _ => observation.encryption,
        };
        self.insert_or_update(
            observation.bssid,
            observation.ssid,
            observation.channel,
            observation.signal_strength,
            encryption,
            now_ms,
        )
    }

    pub fn insert_or_update(
        &mut self,
        bssid: Bssid,
        ssid: Ssid,
        channel: u8,
        signal_strength: i8,
        encryption: EncryptionClass,
        now_ms: u64,
    ) -> InsertOutcome {
        if let Some(&slot) = self.index.get(&bssid) {
            let index = slot as usize;
            let record = &mut self.records[index];
            if !ssid.is_empty() {
                record.ssid = ssid;
            }
            record.channel = channel;
            record.signal_strength = signal_strength;
            record.encryption = encryption;
            record.last_seen_ms = now_ms;
            record.frame_count = record.frame_count.saturating_add(1);
            record.dirty = true;
            return InsertOutcome::Updated { index };
        }

        if self.is_full() {
            return InsertOutcome::Dropped;
        }

        let index = self.records.len();
        let record = NetworkRecord {
            bssid,
            ssid,
            channel,
            signal_strength,
            encryption,
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
            frame_count: 1,
            dirty: true,
        };
        if self.records.push(record).is_err() || self.index.insert(bssid, index as u16).is_err() {
            self.records.truncate(index);
            return InsertOutcome::Dropped;
        }
        InsertOutcome::Inserted { index }
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&NetworkRecord> {
        self.records.get(index)
    }

    /// Live records in first-seen order. Borrowing the table for the whole
    /// pass keeps indices stable until the pass ends.
    pub fn all(&self) -> &[NetworkRecord] {
        &self.records
    }

    pub fn iter(&self) -> core::slice::Iter<'_, NetworkRecord> {
        self.records.iter()
    }

    pub fn find(&self, bssid: &Bssid) -> Option<(usize, &NetworkRecord)> {
        let index = *self.index.get(bssid)? as usize;
        self.records.get(index).map(|record| (index, record))
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    /// Marks one record as consumed by a reader. Returns the previous flag.
    pub fn clear_dirty(&mut self, index: usize) -> bool {
        self.records
            .get_mut(index)
            .map(|record| core::mem::replace(&mut record.dirty, false))
            .unwrap_or(false)
    }

    pub fn clear_all_dirty(&mut self) {
        for record in self.records.iter_mut() {
            record.dirty = false;
        }
    }

    pub fn dirty_count(&self) -> usize {
        self.records.iter().filter(|record| record.dirty).count()
    }
}

impl<'a, const N: usize> IntoIterator for &'a NetworkTable<N> {
    type Item = &'a NetworkRecord;
    type IntoIter = core::slice::Iter<'a, NetworkRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
