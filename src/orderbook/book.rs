//! Top-level order book wiring: grid, bitmaps, storage, FIFO queues, the
//! event log, and (behind the `journal` feature) the write-ahead log,
//! assembled behind the public interface `spec.md` §6 describes.

use crate::bitmap::{BestPriceTracker, LevelBitmap};
use crate::config::BookConfig;
use crate::grid::PriceGrid;
use crate::orderbook::command::{CancelOrder, Command, NewOrder, ReplaceOrder};
use crate::orderbook::error::OrderBookError;
use crate::orderbook::events::{Counters, Event, EventCursor, EventLog};
use crate::orderbook::levels::LevelQueues;
use crate::orderbook::snapshot::RestingSummary;
use crate::orderbook::storage::OrderStorage;
use tracing::{debug, trace};

/// Capacity of the event ring buffer, rounded up to a power of two by
/// [`EventLog::new`]. Sized generously above any single command's event
/// batch so a caller that drains after every command never loses events.
const EVENT_RING_CAPACITY: u32 = 4096;

/// A deterministic, single-instrument limit order book.
///
/// Not [`Send`] or [`Sync`]: the book is mutated by exactly one caller at
/// a time (`spec.md` §5). Wrapping it for cross-thread use is the host's
/// concern, not this crate's.
pub struct OrderBook {
    pub(crate) config: BookConfig,
    pub(crate) grid: PriceGrid,

    pub(crate) bid_bitmap: LevelBitmap,
    pub(crate) ask_bitmap: LevelBitmap,
    pub(crate) bid_best: BestPriceTracker,
    pub(crate) ask_best: BestPriceTracker,
    pub(crate) bid_levels: LevelQueues,
    pub(crate) ask_levels: LevelQueues,

    pub(crate) storage: OrderStorage,
    pub(crate) events: EventLog,

    /// Monotonic count of commands applied since the last `reset`.
    pub(crate) sequence: u64,
    pub(crate) dev_asserts: bool,

    #[cfg(feature = "journal")]
    pub(crate) wal: Option<crate::orderbook::wal::Wal>,
}

impl OrderBook {
    /// Builds a book from a validated configuration. Fails only if
    /// `config` itself is invalid (`spec.md` §7 — never a `REJECT`).
    pub fn new(config: BookConfig) -> Result<Self, OrderBookError> {
        config.validate()?;
        let grid = PriceGrid::new(&config);
        let levels = grid.levels();
        Ok(Self {
            config,
            grid,
            bid_bitmap: LevelBitmap::new(levels),
            ask_bitmap: LevelBitmap::new(levels),
            bid_best: BestPriceTracker::new(false),
            ask_best: BestPriceTracker::new(true),
            bid_levels: LevelQueues::new(levels),
            ask_levels: LevelQueues::new(levels),
            storage: OrderStorage::new(config.max_orders),
            events: EventLog::new(EVENT_RING_CAPACITY),
            sequence: 0,
            dev_asserts: false,
            #[cfg(feature = "journal")]
            wal: None,
        })
    }

    /// Discards all book state and rebuilds it from `config`. Sequence,
    /// event cursor, and counters all restart from zero.
    pub fn reset(&mut self, config: BookConfig) -> Result<(), OrderBookError> {
        *self = Self::new(config)?;
        debug!(tick = config.tick, pmin = config.pmin, pmax = config.pmax, "order book reset");
        Ok(())
    }

    /// Enables or disables expensive internal consistency checks after
    /// every command. Intended for tests and fuzzing, not production use.
    pub fn enable_dev_asserts(&mut self, enabled: bool) {
        self.dev_asserts = enabled;
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    /// Attaches a write-ahead log so every subsequent command is appended
    /// to it before being applied — the router -> WAL -> matching engine
    /// dataflow `spec.md` §4.8 describes. Replaces any previously
    /// attached WAL without flushing it first; callers that care should
    /// [`Self::detach_wal`] and flush it themselves.
    #[cfg(feature = "journal")]
    pub fn attach_wal(&mut self, wal: crate::orderbook::wal::Wal) {
        self.wal = Some(wal);
    }

    /// Detaches and returns the currently attached WAL, if any.
    #[cfg(feature = "journal")]
    pub fn detach_wal(&mut self) -> Option<crate::orderbook::wal::Wal> {
        self.wal.take()
    }

    #[cfg(feature = "journal")]
    fn append_to_wal(&mut self, command: Command) -> Result<(), OrderBookError> {
        if let Some(wal) = self.wal.as_mut() {
            wal.append(command, self.sequence + 1)?;
        }
        Ok(())
    }

    /// Submits a new order. See `spec.md` §4.5 for validation order,
    /// crossing, and posting semantics.
    pub fn new_order(&mut self, order: NewOrder) -> Result<(), OrderBookError> {
        trace!(id = order.id, owner = order.owner, side = %order.side, price = order.price_ticks, qty = order.qty, "new order");
        #[cfg(feature = "journal")]
        self.append_to_wal(Command::New(order))?;
        crate::orderbook::matching::apply_new_order(self, order)?;
        self.sequence += 1;
        self.after_command();
        Ok(())
    }

    /// Cancels a resting order. A no-op (beyond a `Reject` event) if the
    /// id is unknown, inactive, or owned by someone else.
    pub fn cancel(&mut self, cancel: CancelOrder) -> Result<(), OrderBookError> {
        trace!(id = cancel.id, owner = cancel.owner, "cancel order");
        #[cfg(feature = "journal")]
        self.append_to_wal(Command::Cancel(cancel))?;
        crate::orderbook::matching::apply_cancel(self, cancel);
        self.sequence += 1;
        self.after_command();
        Ok(())
    }

    /// Modifies a resting order's quantity and/or price in place.
    pub fn replace(&mut self, replace: ReplaceOrder) -> Result<(), OrderBookError> {
        trace!(id = replace.id, owner = replace.owner, qty_delta = replace.qty_delta, "replace order");
        #[cfg(feature = "journal")]
        self.append_to_wal(Command::Replace(replace))?;
        crate::orderbook::matching::apply_replace(self, replace);
        self.sequence += 1;
        self.after_command();
        Ok(())
    }

    /// Routes a tagged command to the matching operation it represents —
    /// the single entry point `spec.md` §4.9 calls the command router.
    pub fn apply_command(&mut self, command: Command) -> Result<(), OrderBookError> {
        match command {
            Command::New(order) => self.new_order(order),
            Command::Cancel(cancel) => self.cancel(cancel),
            Command::Replace(replace) => self.replace(replace),
        }
    }

    fn after_command(&mut self) {
        if self.dev_asserts {
            self.check_invariants();
        }
    }

    /// Debug-only structural consistency check over the quantified
    /// invariants `spec.md` §8 calls out: bitmap/queue occupancy
    /// agreement, `bestBid < bestAsk` whenever both exist, and the sum of
    /// active orders' remaining quantity equalling `restingLots`.
    fn check_invariants(&self) {
        for level in 0..self.grid.levels() {
            debug_assert_eq!(
                self.bid_bitmap.is_set(level),
                !self.bid_levels.is_empty(level),
                "bid bitmap/queue mismatch at level {level}"
            );
            debug_assert_eq!(
                self.ask_bitmap.is_set(level),
                !self.ask_levels.is_empty(level),
                "ask bitmap/queue mismatch at level {level}"
            );
        }

        if let (Some(bid), Some(ask)) = (self.best_bid_price(), self.best_ask_price()) {
            debug_assert!(bid < ask, "crossed book at rest: bestBid {bid} >= bestAsk {ask}");
        }

        let summary = crate::orderbook::snapshot::resting_summary(self);
        let resting_lots = summary.bid_lots + summary.ask_lots;
        let mut summed: i64 = 0;
        for slot in 0..self.storage.capacity() {
            if self.storage.is_active(slot) {
                summed += self.storage.remaining(slot) as i64;
            }
        }
        debug_assert_eq!(
            summed, resting_lots,
            "sum of active orders' remaining quantity does not match restingLots"
        );
    }

    /// Drains events recorded since `from`, returning them plus a cursor
    /// to resume from on the next call.
    pub fn drain_events(&mut self, from: EventCursor) -> (Vec<Event>, EventCursor) {
        self.events.drain(from)
    }

    /// Cursor pointing at the next event to be recorded. Useful to seed a
    /// fresh consumer without replaying history.
    pub fn event_cursor_head(&self) -> EventCursor {
        self.events.head()
    }

    /// Best (highest) resting bid price, or `None` if the bid side is empty.
    pub fn best_bid_price(&self) -> Option<i64> {
        let level = self.bid_best.best();
        (level != crate::bitmap::NO_LEVEL).then(|| self.grid.level_to_price(level))
    }

    /// Best (lowest) resting ask price, or `None` if the ask side is empty.
    pub fn best_ask_price(&self) -> Option<i64> {
        let level = self.ask_best.best();
        (level != crate::bitmap::NO_LEVEL).then(|| self.grid.level_to_price(level))
    }

    /// A snapshot of the running event counters and rolling event hash.
    pub fn counters(&self) -> Counters {
        self.events.counters()
    }

    /// SHA-256 state digest over the raw order storage plus a JSON
    /// counters trailer. See [`crate::orderbook::snapshot`].
    pub fn compute_state_hash(&self) -> String {
        crate::orderbook::snapshot::compute_state_hash(self)
    }

    /// A canonical single human-readable line summarizing book state,
    /// for logs and manual diffing between implementations.
    pub fn snapshot_line(&self, seed: u64, ops: u64) -> String {
        crate::orderbook::snapshot::snapshot_line(self, seed, ops)
    }

    /// Count and total resting quantity, split by side.
    pub fn resting_summary(&self) -> RestingSummary {
        crate::orderbook::snapshot::resting_summary(self)
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("config", &self.config)
            .field("sequence", &self.sequence)
            .field("best_bid", &self.best_bid_price())
            .field("best_ask", &self.best_ask_price())
            .finish()
    }
}
