//! `BatchMemory`: a bounded ring buffer of prior entries shared across every
//! job in a batch (§5: "shared across jobs in the same batch... protected by
//! a mutex/monitor guarding the ring buffer; read-compute-append is atomic").

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Default ring-buffer capacity per batch (§6 `BATCH_MEMORY_CAPACITY`).
pub const DEFAULT_CAPACITY: usize = 100;

/// One prior article's fingerprint, retained for comparison against later
/// jobs in the same batch.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// Job the fingerprint was computed for.
    pub job_id: Uuid,
    /// Target keyword of the job, kept for diagnostics.
    pub keyword: String,
    /// Character-shingle set used for the Jaccard comparison.
    pub shingles: HashSet<String>,
    /// Embedding vector, if an embedding client was available.
    pub embedding: Option<Vec<f32>>,
}

/// A single batch's bounded history. Invariant 5: `len() <= capacity` at
/// all times — the oldest entry is evicted on overflow.
pub struct BatchMemory {
    capacity: usize,
    entries: Mutex<VecDeque<BatchEntry>>,
}

impl BatchMemory {
    /// Construct an empty memory with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Construct an empty memory at [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Snapshot of the current entries, for read-then-compute by the
    /// checker. Cloned under the lock so the comparison itself can run
    /// lock-free.
    pub(crate) fn snapshot(&self) -> Vec<BatchEntry> {
        self.entries.lock().expect("batch memory lock poisoned").iter().cloned().collect()
    }

    /// Append a new entry, evicting the oldest if the buffer is at capacity.
    pub(crate) fn append(&self, entry: BatchEntry) {
        let mut guard = self.entries.lock().expect("batch memory lock poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(entry);
    }

    /// Current number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("batch memory lock poisoned").len()
    }

    /// True if no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BatchMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-scoped registry handing out one [`BatchMemory`] per `batch_id`,
/// created lazily on first use and shared by every job that names that
/// batch (§5: "shared across jobs in the same batch").
#[derive(Clone, Default)]
pub struct BatchMemoryRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Arc<BatchMemory>>>>,
    capacity: usize,
}

impl BatchMemoryRegistry {
    /// Construct a registry whose batches default to [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Construct a registry whose batches are capped at `capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Fetch the memory for `batch_id`, creating it if this is the first
    /// job seen for that batch.
    #[must_use]
    pub fn get_or_create(&self, batch_id: Uuid) -> Arc<BatchMemory> {
        let mut guard = self.inner.lock().expect("batch registry lock poisoned");
        guard
            .entry(batch_id)
            .or_insert_with(|| Arc::new(BatchMemory::with_capacity(self.capacity)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u8) -> BatchEntry {
        BatchEntry {
            job_id: Uuid::from_u128(n as u128),
            keyword: format!("kw-{n}"),
            shingles: HashSet::new(),
            embedding: None,
        }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mem = BatchMemory::with_capacity(2);
        mem.append(entry(1));
        mem.append(entry(2));
        mem.append(entry(3));
        assert_eq!(mem.len(), 2);
        let ids: Vec<_> = mem.snapshot().into_iter().map(|e| e.job_id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(2), Uuid::from_u128(3)]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mem = BatchMemory::with_capacity(5);
        for n in 0..50u8 {
            mem.append(entry(n));
        }
        assert!(mem.len() <= 5);
    }

    #[test]
    fn registry_returns_same_memory_for_same_batch() {
        let registry = BatchMemoryRegistry::new();
        let batch_id = Uuid::from_u128(7);
        let a = registry.get_or_create(batch_id);
        a.append(entry(1));
        let b = registry.get_or_create(batch_id);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn registry_isolates_different_batches() {
        let registry = BatchMemoryRegistry::new();
        registry.get_or_create(Uuid::from_u128(1)).append(entry(1));
        assert!(registry.get_or_create(Uuid::from_u128(2)).is_empty());
    }
}
