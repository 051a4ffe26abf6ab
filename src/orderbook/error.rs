//! Order book error types: `spec.md` §7.
//!
//! Two families, mirroring the teacher crate's split between a book-level
//! error and a journal-level error: [`RejectReason`] is never an `Err` —
//! it rides inside [`crate::Event::Reject`] and never mutates state beyond
//! the reject counter and rolling event hash. [`OrderBookError`] is fatal:
//! slot exhaustion, bad `reset` configuration, or WAL/snapshot I/O
//! failure, none of which the matching engine can mask.

use std::fmt;

/// Why a command was rejected. Carried on `Event::Reject`; never an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RejectReason {
    /// `id` failed basic validation (e.g. used as a sentinel value).
    BadId,
    /// `owner` failed basic validation.
    BadOwner,
    /// `qtyDelta` in a replace would not produce a valid quantity.
    BadDelta,
    /// `id >= maxOrders`.
    IdTooLarge,
    /// A new order was submitted with an `id` that is currently active.
    DupId,
    /// Price is outside `[pmin, pmax]` or misaligned with `tick`.
    PriceBad,
    /// Quantity is not in `(0, MAX_QTY]`.
    QtyBad,
    /// A replace would overflow the remaining-quantity bounds.
    QtyOverflow,
    /// Cancel/replace referenced an unknown or inactive order id.
    NotFound,
    /// `postOnly` order would have crossed the opposite best price.
    PostOnlyWouldCross,
    /// `IOC` order produced no fill at all.
    IocNoFill,
    /// `FOK` order could not be filled in full.
    FokNoFill,
    /// Self-trade prevention in `cancel-taker` mode rejected the taker.
    StpCancelTaker,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::BadId => "bad id",
            RejectReason::BadOwner => "bad owner",
            RejectReason::BadDelta => "bad delta",
            RejectReason::IdTooLarge => "id too large",
            RejectReason::DupId => "dup id",
            RejectReason::PriceBad => "price bad",
            RejectReason::QtyBad => "qty bad",
            RejectReason::QtyOverflow => "qty overflow",
            RejectReason::NotFound => "not found",
            RejectReason::PostOnlyWouldCross => "postOnly would cross",
            RejectReason::IocNoFill => "IOC no fill",
            RejectReason::FokNoFill => "FOK no fill",
            RejectReason::StpCancelTaker => "STP cancel taker",
        };
        write!(f, "{s}")
    }
}

/// Fatal errors. These terminate the command or bubble a hard error to
/// the host; they are never masked as `REJECT` events (`spec.md` §7).
#[derive(Debug)]
#[non_exhaustive]
pub enum OrderBookError {
    /// The order storage arena has no free slots left. Not reachable
    /// through `new_order`'s own validation (a full book has already
    /// used every valid id, so no further id can pass `IdTooLarge`/
    /// `DupId`) — reachable when restoring a snapshot with more resting
    /// orders than the target book's `max_orders` allows. Per `spec.md`
    /// §5, the caller must not silently drop the command.
    SlotsExhausted,
    /// `reset(config)` was called with an invalid configuration.
    InvalidConfig(crate::config::ConfigError),
    /// A WAL append, flush, or snapshot I/O operation failed.
    #[cfg(feature = "journal")]
    Wal(crate::orderbook::wal::WalError),
    /// WAL replay found a record referencing sequence state earlier than
    /// the snapshot header, which cannot be reconciled.
    ReplayTruncated {
        /// The sequence number at which replay was abandoned.
        at_sequence: u64,
    },
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::SlotsExhausted => write!(f, "order storage arena is full"),
            OrderBookError::InvalidConfig(err) => write!(f, "invalid book configuration: {err}"),
            #[cfg(feature = "journal")]
            OrderBookError::Wal(err) => write!(f, "WAL error: {err}"),
            OrderBookError::ReplayTruncated { at_sequence } => {
                write!(f, "replay truncated past header at sequence {at_sequence}")
            }
        }
    }
}

impl std::error::Error for OrderBookError {}

impl From<crate::config::ConfigError> for OrderBookError {
    fn from(err: crate::config::ConfigError) -> Self {
        OrderBookError::InvalidConfig(err)
    }
}

#[cfg(feature = "journal")]
impl From<crate::orderbook::wal::WalError> for OrderBookError {
    fn from(err: crate::orderbook::wal::WalError) -> Self {
        OrderBookError::Wal(err)
    }
}
