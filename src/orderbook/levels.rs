//! Per-level FIFO queues, threaded through [`OrderStorage`]'s `prev`/`next`
//! columns. `spec.md` §4.4.

use crate::orderbook::storage::{NONE, OrderStorage};

/// Head/tail/count arrays for every price level on one side of the book.
///
/// The queue itself owns no order data — it only threads slots already
/// allocated in an [`OrderStorage`] into doubly-linked FIFOs, one per
/// level, so a book needs two instances (bid side, ask side) sharing one
/// storage arena.
#[derive(Debug, Clone)]
pub struct LevelQueues {
    head: Vec<u32>,
    tail: Vec<u32>,
    count: Vec<u32>,
}

impl LevelQueues {
    /// Creates empty queues for `levels` price levels.
    pub fn new(levels: u32) -> Self {
        let n = levels as usize;
        Self {
            head: vec![NONE; n],
            tail: vec![NONE; n],
            count: vec![0; n],
        }
    }

    #[inline]
    pub fn front(&self, level: u32) -> u32 {
        self.head[level as usize]
    }

    #[inline]
    pub fn count(&self, level: u32) -> u32 {
        self.count[level as usize]
    }

    #[inline]
    pub fn is_empty(&self, level: u32) -> bool {
        self.head[level as usize] == NONE
    }

    /// Raw head/tail slot indices as little-endian bytes, head array then
    /// tail array — part of the state hash input (`spec.md` §4.7:
    /// "level heads/tails (both sides)").
    pub fn head_tail_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.head.len() + self.tail.len()) * 4);
        for &h in &self.head {
            out.extend_from_slice(&h.to_le_bytes());
        }
        for &t in &self.tail {
            out.extend_from_slice(&t.to_le_bytes());
        }
        out
    }

    /// Appends `slot` to the tail of `level`'s FIFO. Returns `true` if
    /// `level` was empty beforehand (the caller must set the level's
    /// occupancy bit and offer it to the best-price tracker).
    pub fn push_back(&mut self, level: u32, slot: u32, storage: &mut OrderStorage) -> bool {
        let l = level as usize;
        let old_tail = self.tail[l];
        storage.set_prev(slot, old_tail);
        storage.set_next(slot, NONE);

        if old_tail == NONE {
            self.head[l] = slot;
        } else {
            storage.set_next(old_tail, slot);
        }
        self.tail[l] = slot;
        self.count[l] += 1;

        old_tail == NONE
    }

    /// Unlinks `slot` from `level`'s FIFO (`slot` must currently belong to
    /// it). Returns `true` if `level` is now empty (the caller must clear
    /// the level's occupancy bit and notify the best-price tracker).
    pub fn remove(&mut self, level: u32, slot: u32, storage: &mut OrderStorage) -> bool {
        let l = level as usize;
        let prev = storage.prev(slot);
        let next = storage.next(slot);

        if prev == NONE {
            self.head[l] = next;
        } else {
            storage.set_next(prev, next);
        }
        if next == NONE {
            self.tail[l] = prev;
        } else {
            storage.set_prev(next, prev);
        }

        storage.set_prev(slot, NONE);
        storage.set_next(slot, NONE);
        self.count[l] -= 1;

        self.head[l] == NONE
    }
}
