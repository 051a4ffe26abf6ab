//! Event emission: the event enum, the fixed-capacity ring buffer, the
//! rolling event hash ("eHash"), and the running counters that back the
//! state digest's JSON trailer. `spec.md` §4.7.

use crate::orderbook::command::Side;
use crate::orderbook::error::RejectReason;
use serde::{Deserialize, Serialize};

/// One book-level event. Emitted in strict sequence order; never
/// reordered, never dropped except by ring-buffer overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A new order was accepted (it may also have matched — a `Trade`
    /// precedes this in the same command's event batch).
    Ack { id: u32, owner: u32 },
    /// A command was rejected; no state mutation beyond counters/hash.
    Reject {
        id: u32,
        owner: u32,
        reason: RejectReason,
    },
    /// A taker crossed against a resting maker at the maker's price.
    Trade {
        maker_id: u32,
        maker_owner: u32,
        taker_id: u32,
        taker_owner: u32,
        side: Side,
        price_ticks: i64,
        qty: i32,
    },
    /// A resting order's quantity was reduced without a full fill —
    /// either a `replace` size-down or a self-trade-prevention
    /// decrement-maker action.
    Reduced {
        id: u32,
        owner: u32,
        new_remaining: i32,
    },
    /// An order left the book via explicit cancel, post-only rejection
    /// recovery, STP cancel-taker, or IOC/FOK non-rest.
    Canceled { id: u32, owner: u32 },
    /// An order's remaining quantity reached zero via matching.
    Filled { id: u32, owner: u32 },
}

impl Event {
    const KIND_ACK: u8 = 0;
    const KIND_REJECT: u8 = 1;
    const KIND_TRADE: u8 = 2;
    const KIND_REDUCED: u8 = 3;
    const KIND_CANCELED: u8 = 4;
    const KIND_FILLED: u8 = 5;

    /// The four 16-bit fields mixed into the rolling event hash, chosen
    /// per-variant to cover the fields that distinguish one instance of
    /// that event from another.
    fn hash_fields(&self) -> (u8, u16, u16, u16, u16) {
        fn lo16(x: u32) -> u16 {
            x as u16
        }
        fn lo16_i64(x: i64) -> u16 {
            x as u16
        }
        fn lo16_i32(x: i32) -> u16 {
            x as u16
        }

        match *self {
            Event::Ack { id, owner } => (Self::KIND_ACK, lo16(id), lo16(owner), 0, 0),
            Event::Reject { id, owner, reason } => (
                Self::KIND_REJECT,
                lo16(id),
                lo16(owner),
                reason as u16,
                0,
            ),
            Event::Trade {
                maker_id,
                taker_id,
                price_ticks,
                qty,
                ..
            } => (
                Self::KIND_TRADE,
                lo16(maker_id),
                lo16(taker_id),
                lo16_i64(price_ticks),
                lo16_i32(qty),
            ),
            Event::Reduced {
                id, new_remaining, ..
            } => (
                Self::KIND_REDUCED,
                lo16(id),
                lo16_i32(new_remaining),
                0,
                0,
            ),
            Event::Canceled { id, owner } => (Self::KIND_CANCELED, lo16(id), lo16(owner), 0, 0),
            Event::Filled { id, owner } => (Self::KIND_FILLED, lo16(id), lo16(owner), 0, 0),
        }
    }
}

/// Multiplicative constant used to mix each field into the rolling hash.
/// Odd, large, and unrelated to the field widths — any such constant
/// works; this one is the traditional 64-bit golden-ratio multiplier.
const HASH_PRIME: u64 = 0x9E37_79B9_7F4A_7C15;

/// 53-bit mask applied to the rolling event hash after each mix step, so
/// the result fits losslessly in an `f64` / a JSON integer.
const HASH_MASK_53: u64 = (1u64 << 53) - 1;

fn mix_event_hash(prev: u64, event: &Event) -> u64 {
    let (kind, f0, f1, f2, f3) = event.hash_fields();
    let mut h = prev;
    h = h.wrapping_mul(HASH_PRIME) ^ (kind as u64);
    h = h.wrapping_mul(HASH_PRIME) ^ (f0 as u64);
    h = h.wrapping_mul(HASH_PRIME) ^ (f1 as u64);
    h = h.wrapping_mul(HASH_PRIME) ^ (f2 as u64);
    h = h.wrapping_mul(HASH_PRIME) ^ (f3 as u64);
    h & HASH_MASK_53
}

/// Running counters, serialized verbatim into the state digest's JSON
/// trailer (`spec.md` §4.7). All accumulators wrap on overflow rather
/// than panic or widen — they are checksums, not accounting totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub ack_count: u64,
    pub reject_count: u64,
    pub trade_count: u64,
    pub reduced_count: u64,
    pub canceled_count: u64,
    pub filled_count: u64,
    pub trade_qty_sum: i64,
    pub trade_notional_ticks_sum: i64,
    pub trade_checksum: u64,
    /// The rolling 53-bit event hash ("eHash"), updated on every emitted
    /// event regardless of kind.
    pub event_hash: u64,
}

impl Counters {
    fn apply(&mut self, event: &Event) {
        match *event {
            Event::Ack { .. } => self.ack_count += 1,
            Event::Reject { .. } => self.reject_count += 1,
            Event::Trade {
                price_ticks, qty, ..
            } => {
                self.trade_count += 1;
                self.trade_qty_sum = self.trade_qty_sum.wrapping_add(qty as i64);
                self.trade_notional_ticks_sum = self
                    .trade_notional_ticks_sum
                    .wrapping_add(price_ticks.wrapping_mul(qty as i64));
                self.trade_checksum = self
                    .trade_checksum
                    .wrapping_mul(HASH_PRIME)
                    .wrapping_add(price_ticks as u64)
                    .wrapping_add((qty as u64) << 1);
            }
            Event::Reduced { .. } => self.reduced_count += 1,
            Event::Canceled { .. } => self.canceled_count += 1,
            Event::Filled { .. } => self.filled_count += 1,
        }
        self.event_hash = mix_event_hash(self.event_hash, event);
    }
}

/// An opaque position in the event stream, returned by
/// [`EventLog::drain`] and accepted back by the next call. Monotonic
/// across a book's lifetime (not reset by `reset(config)` in the same
/// way sequence numbers are — see `spec.md` §4.9 for the distinction
/// between event sequence and command sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventCursor(pub u64);

impl EventCursor {
    /// The cursor value at the start of a book's life, or immediately
    /// after `reset(config)`.
    pub const START: EventCursor = EventCursor(0);
}

/// Fixed-capacity power-of-two ring buffer of events, plus the counters
/// and rolling hash derived from the full (unbounded) event stream.
///
/// The ring only ever holds the most recent `capacity` events; counters
/// and the event hash cover every event ever emitted, so a consumer that
/// falls behind the ring's capacity still gets a correct digest, just an
/// incomplete replay of individual events.
#[derive(Debug, Clone)]
pub struct EventLog {
    buf: Vec<Option<(u64, Event)>>,
    mask: u64,
    write_seq: u64,
    counters: Counters,
}

impl EventLog {
    /// `capacity` is rounded up to the next power of two (minimum 1).
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            buf: vec![None; capacity as usize],
            mask: (capacity - 1) as u64,
            write_seq: 0,
            counters: Counters::default(),
        }
    }

    #[inline]
    pub fn counters(&self) -> Counters {
        self.counters
    }

    #[inline]
    pub fn head(&self) -> EventCursor {
        EventCursor(self.write_seq)
    }

    /// Records `event`: assigns it the next sequence number, updates
    /// counters and the rolling hash, and stores it in the ring
    /// (overwriting the oldest entry if full).
    pub fn record(&mut self, event: Event) -> u64 {
        let seq = self.write_seq;
        let idx = (seq & self.mask) as usize;
        self.buf[idx] = Some((seq, event));
        self.write_seq += 1;
        self.counters.apply(&event);
        seq
    }

    /// Drains every event from `cursor` up to the current head,
    /// returning the events still present in the ring and a new cursor
    /// to resume from. If `cursor` points further back than the ring's
    /// capacity, the gap is silently skipped — the caller lost events to
    /// overwrite and can only resume from what remains.
    pub fn drain(&mut self, cursor: EventCursor) -> (Vec<Event>, EventCursor) {
        let capacity = self.buf.len() as u64;
        let earliest_available = self.write_seq.saturating_sub(capacity);
        let start = cursor.0.max(earliest_available);

        let mut out = Vec::new();
        let mut seq = start;
        while seq < self.write_seq {
            let idx = (seq & self.mask) as usize;
            if let Some((stored_seq, event)) = self.buf[idx] {
                if stored_seq == seq {
                    out.push(event);
                }
            }
            seq += 1;
        }
        (out, self.head())
    }
}
