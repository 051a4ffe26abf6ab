//! Book configuration accepted by [`crate::OrderBook::reset`].

use crate::orderbook::command::StpPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum quantity (lots) accepted for a single order, per `spec.md` §4.5.
pub const MAX_QTY: i32 = i32::MAX;

/// Immutable configuration for the life of a book instance.
///
/// Mirrors `spec.md` §3 "Configuration": tick size, price bounds,
/// capacity, and the self-trade-prevention policy. All fields are
/// validated by [`BookConfig::validate`] before a book is reset into
/// this configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookConfig {
    /// Integer price-unit increment between adjacent levels. Must be > 0.
    pub tick: i64,
    /// Minimum tradable price, in ticks.
    pub pmin: i64,
    /// Maximum tradable price, in ticks. Must be >= `pmin`.
    pub pmax: i64,
    /// Capacity of the order storage arena. Order ids must be `< max_orders`.
    pub max_orders: u32,
    /// Self-trade prevention policy applied by the matching engine.
    pub stp_policy: StpPolicy,
}

impl BookConfig {
    /// Number of price levels implied by this configuration:
    /// `((pmax - pmin) / tick) + 1`, per `spec.md` §4.1.
    pub fn levels(&self) -> u32 {
        (((self.pmax - self.pmin) / self.tick) + 1) as u32
    }

    /// Validates the configuration, failing with a descriptive error.
    ///
    /// `reset` must call this before committing to a new configuration;
    /// an invalid config is a fatal, process-terminating condition per
    /// `spec.md` §7 — it is never surfaced as a `REJECT` event.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick <= 0 {
            return Err(ConfigError::NonPositiveTick { tick: self.tick });
        }
        if self.pmax < self.pmin {
            return Err(ConfigError::InvertedBounds {
                pmin: self.pmin,
                pmax: self.pmax,
            });
        }
        if (self.pmax - self.pmin) % self.tick != 0 {
            return Err(ConfigError::MisalignedBounds {
                pmin: self.pmin,
                pmax: self.pmax,
                tick: self.tick,
            });
        }
        if self.max_orders == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let levels = self.levels() as u64;
        if levels == 0 || levels > (u32::MAX as u64) {
            return Err(ConfigError::TooManyLevels { levels });
        }
        Ok(())
    }
}

/// Fatal configuration errors, surfaced from [`BookConfig::validate`] /
/// [`crate::OrderBook::reset`]. These terminate the `reset` call; they
/// are never turned into `REJECT` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// `tick` was zero or negative.
    NonPositiveTick {
        /// The offending tick size.
        tick: i64,
    },
    /// `pmax < pmin`.
    InvertedBounds {
        /// Configured minimum price.
        pmin: i64,
        /// Configured maximum price.
        pmax: i64,
    },
    /// `(pmax - pmin)` is not an exact multiple of `tick`.
    MisalignedBounds {
        /// Configured minimum price.
        pmin: i64,
        /// Configured maximum price.
        pmax: i64,
        /// Configured tick size.
        tick: i64,
    },
    /// `max_orders` was zero.
    ZeroCapacity,
    /// The grid implied by `(pmin, pmax, tick)` has too many levels to index.
    TooManyLevels {
        /// Computed level count.
        levels: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveTick { tick } => {
                write!(f, "tick size must be positive, got {tick}")
            }
            ConfigError::InvertedBounds { pmin, pmax } => {
                write!(f, "pmax ({pmax}) must be >= pmin ({pmin})")
            }
            ConfigError::MisalignedBounds { pmin, pmax, tick } => {
                write!(
                    f,
                    "(pmax - pmin) = {} is not a multiple of tick {tick}",
                    pmax - pmin
                )
            }
            ConfigError::ZeroCapacity => write!(f, "max_orders must be greater than zero"),
            ConfigError::TooManyLevels { levels } => {
                write!(f, "price grid has {levels} levels, which exceeds the indexable range")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
