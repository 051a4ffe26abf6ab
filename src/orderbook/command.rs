//! Command router types: the tagged union the matching engine accepts,
//! and the wire-format constants shared with the WAL. `spec.md` §4.9, §6.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order; crosses against the ask side.
    Buy = 0,
    /// Sell order; crosses against the bid side.
    Sell = 1,
}

impl Side {
    /// The side an order on `self` crosses against.
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Time-in-force policy for a new order. `spec.md` glossary: GTC rests,
/// IOC never rests, FOK is all-or-nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TimeInForce {
    /// Good-till-canceled: unmatched remainder posts to the book.
    #[default]
    Gtc = 0,
    /// Immediate-or-cancel: unmatched remainder is discarded, never posted.
    Ioc = 1,
    /// Fill-or-kill: the entire order must be fillable immediately, or the
    /// whole command is rejected with no state change.
    Fok = 2,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
        }
    }
}

/// Self-trade prevention policy for the book. `spec.md` §3, §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum StpPolicy {
    /// No self-trade prevention; same-owner orders may match freely.
    #[default]
    Off = 0,
    /// Reject the incoming (taker) order entirely on self-trade conflict.
    CancelTaker = 1,
    /// Reduce the resting (maker) order and continue matching; no trade
    /// is emitted for the decremented quantity.
    DecrementMaker = 2,
}

impl fmt::Display for StpPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StpPolicy::Off => write!(f, "off"),
            StpPolicy::CancelTaker => write!(f, "cancel-taker"),
            StpPolicy::DecrementMaker => write!(f, "decrement-maker"),
        }
    }
}

/// Sentinel price meaning "leave price unchanged" in a [`Command::Replace`],
/// matching the WAL record's `i64::MIN` null sentinel (`spec.md` §6).
pub const NULL_PRICE: i64 = i64::MIN;

/// A new-order command. `spec.md` §4.5 `new(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub owner: u32,
    pub id: u32,
    pub side: Side,
    pub price_ticks: i64,
    pub qty: i32,
    pub tif: TimeInForce,
    pub post_only: bool,
    pub reduce_only: bool,
}

/// A cancel command. `spec.md` §4.5 `cancel(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub owner: u32,
    pub id: u32,
}

/// A replace (modify) command. `spec.md` §4.5 `replace(...)`.
///
/// `new_price_ticks = None` preserves the current price; `qty_delta` may
/// be negative (size-down) or positive (size-up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOrder {
    pub owner: u32,
    pub id: u32,
    pub new_price_ticks: Option<i64>,
    pub qty_delta: i32,
}

/// The tagged union accepted by the command router
/// ([`crate::OrderBook::apply_command`]), `spec.md` §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    New(NewOrder),
    Cancel(CancelOrder),
    Replace(ReplaceOrder),
}

/// WAL record `kind` byte values, `spec.md` §6.
pub mod wire {
    use bitflags::bitflags;

    /// `Command::New` discriminant on the wire.
    pub const KIND_NEW: u8 = 0;
    /// `Command::Cancel` discriminant on the wire.
    pub const KIND_CANCEL: u8 = 1;
    /// `Command::Replace` discriminant on the wire.
    pub const KIND_REPLACE: u8 = 2;

    bitflags! {
        /// The WAL record's flags byte: `spec.md` §6 "flags byte
        /// (bit0=postOnly, bit1=reduceOnly)".
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub struct RecordFlags: u8 {
            const POST_ONLY = 1 << 0;
            const REDUCE_ONLY = 1 << 1;
        }
    }
}
