/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/10/25
******************************************************************************/

//! Prelude module that re-exports commonly used types and traits.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use lob_core::prelude::*;
//! ```

pub use crate::config::{BookConfig, ConfigError};
pub use crate::orderbook::OrderBook;
pub use crate::orderbook::command::{
    CancelOrder, Command, NewOrder, ReplaceOrder, Side, StpPolicy, TimeInForce,
};
pub use crate::orderbook::error::{OrderBookError, RejectReason};
pub use crate::orderbook::events::{Counters, Event, EventCursor};
pub use crate::orderbook::snapshot::RestingSummary;
pub use crate::utils::current_time_millis;

#[cfg(feature = "journal")]
pub use crate::orderbook::wal::{Wal, WalError, WalReplay, read_snapshot, write_snapshot};
