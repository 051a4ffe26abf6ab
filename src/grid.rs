//! Integer tick grid mapping prices to price-level indices. `spec.md` §4.1.

use crate::config::BookConfig;

/// Maps integer prices in `[pmin, pmax]` to dense level indices
/// `[0, levels)` and back.
#[derive(Debug, Clone, Copy)]
pub struct PriceGrid {
    tick: i64,
    pmin: i64,
    pmax: i64,
    levels: u32,
}

impl PriceGrid {
    /// Builds a grid from an already-validated [`BookConfig`].
    pub fn new(config: &BookConfig) -> Self {
        Self {
            tick: config.tick,
            pmin: config.pmin,
            pmax: config.pmax,
            levels: config.levels(),
        }
    }

    /// Number of distinct price levels in `[pmin, pmax]`.
    #[inline]
    pub fn levels(&self) -> u32 {
        self.levels
    }

    #[inline]
    pub fn tick(&self) -> i64 {
        self.tick
    }

    #[inline]
    pub fn pmin(&self) -> i64 {
        self.pmin
    }

    #[inline]
    pub fn pmax(&self) -> i64 {
        self.pmax
    }

    /// `true` iff `price` lies on the grid: within `[pmin, pmax]` and an
    /// exact multiple of `tick` offset from `pmin`.
    #[inline]
    pub fn is_valid_price(&self, price: i64) -> bool {
        price >= self.pmin && price <= self.pmax && (price - self.pmin) % self.tick == 0
    }

    /// `priceToLevel(p) = (p - pmin) / tick`. Caller must have already
    /// validated `price` with [`Self::is_valid_price`].
    #[inline]
    pub fn price_to_level(&self, price: i64) -> u32 {
        debug_assert!(self.is_valid_price(price));
        ((price - self.pmin) / self.tick) as u32
    }

    /// Inverse of [`Self::price_to_level`].
    #[inline]
    pub fn level_to_price(&self, level: u32) -> i64 {
        debug_assert!(level < self.levels);
        self.pmin + (level as i64) * self.tick
    }
}
