//! State digest and canonical snapshot line. `spec.md` §4.7.
//!
//! The state hash is SHA-256 over the raw struct-of-arrays bytes (active
//! flags, level indices, remaining quantities — the full order storage
//! arena, not just resting orders), the per-level FIFO head/tail arrays
//! and occupancy bitmaps for both sides, followed by a JSON-serialized
//! trailer of the running [`Counters`]. Two implementations that agree on
//! every byte of storage and every counter will always agree on this
//! hash, independent of allocation order or platform.

use crate::orderbook::book::OrderBook;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Count and total resting quantity, split by side. `spec.md` §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestingSummary {
    pub bid_orders: u32,
    pub bid_lots: i64,
    pub ask_orders: u32,
    pub ask_lots: i64,
}

/// SHA-256 over the raw order storage bytes plus a JSON counters
/// trailer, hex-encoded.
pub fn compute_state_hash(book: &OrderBook) -> String {
    let mut hasher = Sha256::new();
    hasher.update(book.storage.active_bytes());
    hasher.update(book.storage.level_bytes());
    hasher.update(book.storage.remaining_bytes());
    hasher.update(book.bid_levels.head_tail_bytes());
    hasher.update(book.ask_levels.head_tail_bytes());
    hasher.update(book.bid_bitmap.raw_bytes());
    hasher.update(book.ask_bitmap.raw_bytes());

    let counters = book.events.counters();
    let trailer = serde_json::to_vec(&counters).expect("Counters serialization never fails");
    hasher.update(&trailer);

    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Tallies resting order count and quantity per side by scanning the
/// storage arena. O(`max_orders`) — meant for snapshots and logging, not
/// the matching hot path.
pub fn resting_summary(book: &OrderBook) -> RestingSummary {
    use crate::orderbook::command::Side;

    let mut summary = RestingSummary::default();
    for slot in 0..book.storage.capacity() {
        if !book.storage.is_active(slot) {
            continue;
        }
        match book.storage.side(slot) {
            Side::Buy => {
                summary.bid_orders += 1;
                summary.bid_lots += book.storage.remaining(slot) as i64;
            }
            Side::Sell => {
                summary.ask_orders += 1;
                summary.ask_lots += book.storage.remaining(slot) as i64;
            }
        }
    }
    summary
}

/// A canonical, single-line human-readable summary of book state —
/// `seed`/`ops` identify the run that produced it, for diffing two
/// implementations' logs line by line.
pub fn snapshot_line(book: &OrderBook, seed: u64, ops: u64) -> String {
    let resting = resting_summary(book);
    let counters = book.events.counters();
    let best_bid = book
        .best_bid_price()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "NA".to_string());
    let best_ask = book
        .best_ask_price()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "NA".to_string());

    format!(
        "seed={seed} ops={ops} seq={seq} bestBid={best_bid} bestAsk={best_ask} \
         restingBid={rb}/{rbl} restingAsk={ra}/{ral} trades={trades} \
         eHash={ehash:013x} stateHash={state_hash}",
        seq = book.sequence,
        rb = resting.bid_orders,
        rbl = resting.bid_lots,
        ra = resting.ask_orders,
        ral = resting.ask_lots,
        trades = counters.trade_count,
        ehash = counters.event_hash,
        state_hash = compute_state_hash(book),
    )
}
