//! # Single-Symbol Limit Order Book Core
//!
//! A deterministic, single-threaded matching engine for one instrument:
//! price-time priority, FIFO queues per price level, O(1) cancellation,
//! and content-addressable state/event hashes suitable for snapshotting
//! and cross-implementation verification.
//!
//! ## Design Goals
//!
//! 1. **Determinism**: the state hash and rolling event hash after
//!    applying a command sequence depend only on the configuration and
//!    that sequence — never on wall-clock time, thread scheduling, or
//!    allocator behavior.
//! 2. **Cache-friendly layout**: order storage is struct-of-arrays,
//!    indexed by a slot drawn from a free-list; price levels are
//!    threaded through that storage rather than boxed individually.
//! 3. **No hidden state**: every accepted command produces events in the
//!    fixed-capacity ring; every rejected command leaves state untouched
//!    except the reject counter and rolling event hash.
//!
//! ## What this crate is not
//!
//! Not multi-symbol, not concurrent (the book is mutated by exactly one
//! caller at a time), not floating point, and not a network service —
//! those are the surrounding host's concerns.

pub mod bitmap;
pub mod config;
pub mod grid;
pub mod orderbook;
pub mod prelude;
mod utils;

pub use config::{BookConfig, ConfigError};
pub use grid::PriceGrid;
pub use orderbook::book::OrderBook;
pub use orderbook::command::{CancelOrder, Command, NewOrder, ReplaceOrder, Side, StpPolicy, TimeInForce};
pub use orderbook::error::{OrderBookError, RejectReason};
pub use orderbook::events::{Counters, Event, EventCursor};
pub use orderbook::snapshot::RestingSummary;
#[cfg(feature = "journal")]
pub use orderbook::wal::{Wal, WalError, WalReplay, read_snapshot, write_snapshot};
