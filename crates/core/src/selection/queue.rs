//! Indexed binary max-heap keyed by product.
//!
//! The heap array holds `(id, priority)` entries; `positions` maps every live
//! id to its slot and is rewritten on each swap, so any entry can be found and
//! re-prioritised in O(log n) without scanning. Extracted ids move to
//! `extracted`, which is what separates "already selected" (a no-op on
//! decrease) from "never inserted" (an integration bug).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq)]
struct HeapEntry {
    id: ProductId,
    priority: f64,
}

impl HeapEntry {
    /// Higher priority first, then the lower identifier.
    fn outranks(&self, other: &HeapEntry) -> bool {
        match self.priority.total_cmp(&other.priority) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.id < other.id,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct IndexedPriorityQueue {
    heap: Vec<HeapEntry>,
    positions: HashMap<ProductId, usize>,
    extracted: HashSet<ProductId>,
}

impl IndexedPriorityQueue {
    /// Builds the heap in O(n). A repeated id keeps its last priority.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ProductId, f64)>,
    {
        let mut queue = Self::default();
        for (id, priority) in entries {
            let priority = canonical_priority(&id, priority);
            match queue.positions.get(&id) {
                Some(&slot) => queue.heap[slot].priority = priority,
                None => {
                    queue.positions.insert(id.clone(), queue.heap.len());
                    queue.heap.push(HeapEntry { id, priority });
                }
            }
        }

        for slot in (0..queue.heap.len() / 2).rev() {
            queue.sift_down(slot);
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn was_extracted(&self, id: &ProductId) -> bool {
        self.extracted.contains(id)
    }

    /// Current priority of a live entry.
    pub fn priority(&self, id: &ProductId) -> Option<f64> {
        self.positions.get(id).map(|&slot| self.heap[slot].priority)
    }

    pub fn peek_max(&self) -> Option<(&ProductId, f64)> {
        self.heap.first().map(|entry| (&entry.id, entry.priority))
    }

    pub fn extract_max(&mut self) -> Option<(ProductId, f64)> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.positions.remove(&entry.id);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }

        self.extracted.insert(entry.id.clone());
        Some((entry.id, entry.priority))
    }

    /// Lowers the priority of `id` by `delta`.
    ///
    /// Extracted ids are accepted and ignored. Ids that were never inserted
    /// return [`DomainError::UnknownEntry`].
    pub fn decrease_priority(&mut self, id: &ProductId, delta: f64) -> Result<(), DomainError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(DomainError::InvalidPriorityDelta { id: id.clone(), delta });
        }

        let Some(&slot) = self.positions.get(id) else {
            if self.extracted.contains(id) {
                return Ok(());
            }
            return Err(DomainError::UnknownEntry { id: id.clone() });
        };

        let lowered = self.heap[slot].priority - delta;
        self.heap[slot].priority = if lowered == 0.0 { 0.0 } else { lowered };
        self.sift_down(slot);
        Ok(())
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut best = slot;

            if left < self.heap.len() && self.heap[left].outranks(&self.heap[best]) {
                best = left;
            }
            if right < self.heap.len() && self.heap[right].outranks(&self.heap[best]) {
                best = right;
            }
            if best == slot {
                return;
            }

            self.swap(slot, best);
            slot = best;
        }
    }

    fn swap(&mut self, left: usize, right: usize) {
        if left == right {
            return;
        }
        self.heap.swap(left, right);
        for slot in [left, right] {
            if let Some(position) = self.positions.get_mut(&self.heap[slot].id) {
                *position = slot;
            }
        }
    }
}

impl FromIterator<(ProductId, f64)> for IndexedPriorityQueue {
    fn from_iter<I: IntoIterator<Item = (ProductId, f64)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

fn canonical_priority(id: &ProductId, priority: f64) -> f64 {
    if priority.is_nan() {
        warn!(
            event_name = "selection.queue.nan_priority",
            product_id = %id,
            "NaN priority replaced with zero"
        );
        return 0.0;
    }
    // Folds -0.0 into 0.0 so total_cmp does not split equal priorities.
    if priority == 0.0 {
        0.0
    } else {
        priority
    }
}
