//! Integration tests driven entirely through the public API surface
//! (`lob_core::prelude`), complementing the `#[cfg(test)]` modules
//! embedded next to each internal component. Layout mirrors the
//! teacher's `tests/unit/` split: one file per concern.

mod golden_snapshot_tests;
mod property_tests;

#[cfg(feature = "journal")]
mod snapshot_restore_tests;
