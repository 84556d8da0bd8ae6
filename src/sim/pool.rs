//! Slot pool for short-lived entities
//!
//! Projectiles and particles churn heavily; both are stored in a preallocated
//! slot arena with a LIFO free list of indices. `acquire` pops a free index or
//! grows the arena when none remain - overflow is a performance signal, not an
//! error. The retention cap is enforced on `release`: once the free list is
//! full, returned slots are abandoned rather than recycled.

use serde::{Deserialize, Serialize};

/// A single pool slot. A dead slot keeps its last value until reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    value: T,
    alive: bool,
}

/// Fixed-capacity slot arena with index free list.
///
/// Ownership of a live slot belongs to the active set until `release` is
/// called; indices handed out by `acquire` stay valid for the slot's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    /// Maximum free-list length; releases past this are dropped
    capacity: usize,
    alive_count: usize,
}

impl<T: Default> Pool<T> {
    /// Preallocate `capacity` slots, all on the free list.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot {
            value: T::default(),
            alive: false,
        });
        // LIFO: slot 0 comes off first
        let free = (0..capacity).rev().collect();
        Self {
            slots,
            free,
            capacity,
            alive_count: 0,
        }
    }

    /// Place `value` into a slot and return its index.
    pub fn acquire(&mut self, value: T) -> usize {
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx].value = value;
                idx
            }
            None => {
                self.slots.push(Slot { value, alive: false });
                self.slots.len() - 1
            }
        };
        self.slots[idx].alive = true;
        self.alive_count += 1;
        idx
    }

    /// Return a slot to the free list. Dead slots are ignored; slots past the
    /// retention cap are abandoned.
    pub fn release(&mut self, idx: usize) {
        let Some(slot) = self.slots.get_mut(idx) else {
            return;
        };
        if !slot.alive {
            return;
        }
        slot.alive = false;
        self.alive_count -= 1;
        if self.free.len() < self.capacity {
            self.free.push(idx);
        }
    }

    pub fn is_alive(&self, idx: usize) -> bool {
        self.slots.get(idx).is_some_and(|s| s.alive)
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx).filter(|s| s.alive).map(|s| &s.value)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.slots
            .get_mut(idx)
            .filter(|s| s.alive)
            .map(|s| &mut s.value)
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.alive_count
    }

    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Total slots ever allocated (live + free + abandoned)
    pub fn arena_size(&self) -> usize {
        self.slots.len()
    }

    /// Iterate live slots in index order (deterministic)
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .map(|(i, s)| (i, &s.value))
    }

    /// Mutable iteration over live slots in index order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .map(|(i, s)| (i, &mut s.value))
    }

    /// Release every slot for which `predicate` returns false.
    pub fn retain(&mut self, mut predicate: impl FnMut(usize, &T) -> bool) {
        let dead: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(i, s)| s.alive && !predicate(*i, &s.value))
            .map(|(i, _)| i)
            .collect();
        for idx in dead {
            self.release(idx);
        }
    }
}
