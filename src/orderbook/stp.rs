//! Self-trade prevention (STP) decision logic. `spec.md` §4.5, §9.
//!
//! # Policies
//!
//! - [`StpPolicy::Off`] — no checks, zero overhead on the matching hot path.
//! - [`StpPolicy::CancelTaker`] — abandon the taker entirely on the first
//!   same-owner conflict; any fills against other owners earlier in the
//!   same command are kept.
//! - [`StpPolicy::DecrementMaker`] — reduce the conflicting maker by the
//!   crossing quantity without a trade (removing it if that reduction
//!   empties it) and continue crossing against the next resting order.
//!
//! STP compares raw `owner` equality only — no sub-account hierarchy, no
//! anonymous-owner bypass. An open question in the expanded spec; decided
//! this way because the core exposes no concept of account grouping and
//! inventing one would be scope creep.
//!
//! [`StpPolicy::DecrementMaker`] can in principle chain through an entire
//! price level if every resting order happens to share the taker's owner.
//! The matching engine bounds that chain to the level's order count
//! observed at the start of the crossing step, so a policy that keeps
//! producing conflicts terminates in the same command rather than
//! spinning past orders added by its own decrements.

use crate::orderbook::command::StpPolicy;

/// What the matching engine should do about one taker/maker pair before
/// it would otherwise cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StpOutcome {
    /// No conflict (different owners, or the policy is off): proceed to
    /// match normally.
    Proceed,
    /// Abandon the taker: emit `Reject` with
    /// [`crate::RejectReason::StpCancelTaker`] and stop crossing.
    CancelTaker,
    /// Reduce the maker without a trade (removing it if the reduction
    /// empties it) and continue crossing the same taker against the
    /// next resting order.
    DecrementMaker,
}

/// Decides what to do about a taker crossing against a resting maker
/// order, given the book's configured policy.
#[inline]
pub fn check(policy: StpPolicy, taker_owner: u32, maker_owner: u32) -> StpOutcome {
    if policy == StpPolicy::Off || taker_owner != maker_owner {
        return StpOutcome::Proceed;
    }
    match policy {
        StpPolicy::Off => unreachable!("handled above"),
        StpPolicy::CancelTaker => StpOutcome::CancelTaker,
        StpPolicy::DecrementMaker => StpOutcome::DecrementMaker,
    }
}
