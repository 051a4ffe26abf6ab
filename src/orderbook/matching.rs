//! The matching engine: validation, crossing, posting, cancel, and
//! replace, operating on [`OrderBook`]'s internal structures. `spec.md`
//! §4.5.

use crate::bitmap::{BestPriceTracker, LevelBitmap, NO_LEVEL};
use crate::orderbook::book::OrderBook;
use crate::orderbook::command::{CancelOrder, NewOrder, ReplaceOrder, Side, TimeInForce};
use crate::orderbook::error::{OrderBookError, RejectReason};
use crate::orderbook::events::Event;
use crate::orderbook::levels::LevelQueues;
use crate::orderbook::storage::{NONE, OrderStorage};
use crate::orderbook::stp::{self, StpOutcome};

/// Reserved id value: never a valid order id (mirrors the storage
/// arena's own `NONE` sentinel, so an id this large can never collide
/// with a real slot).
const RESERVED_ID: u32 = u32::MAX;
/// Reserved owner value, rejected up front so it can never collide with
/// a conflict check against a legitimate owner.
const RESERVED_OWNER: u32 = u32::MAX;

fn insert_order(
    bitmap: &mut LevelBitmap,
    best: &mut BestPriceTracker,
    levels: &mut LevelQueues,
    storage: &mut OrderStorage,
    level: u32,
    slot: u32,
) {
    let was_empty = levels.push_back(level, slot, storage);
    if was_empty {
        bitmap.set(level);
        best.on_enqueue(level);
    }
}

fn remove_order(
    bitmap: &mut LevelBitmap,
    best: &mut BestPriceTracker,
    levels: &mut LevelQueues,
    storage: &mut OrderStorage,
    level: u32,
    slot: u32,
) {
    let now_empty = levels.remove(level, slot, storage);
    if now_empty {
        bitmap.clear(level);
        best.on_level_emptied(level, bitmap);
    }
}

/// Inserts `slot` into `side`'s book at `level`, borrowing the four
/// disjoint fields of `book` it needs directly (so the borrow checker
/// sees them as independent, not routed through a sub-borrowing helper).
macro_rules! insert_into_side {
    ($book:expr, $side:expr, $level:expr, $slot:expr) => {
        match $side {
            Side::Buy => insert_order(
                &mut $book.bid_bitmap,
                &mut $book.bid_best,
                &mut $book.bid_levels,
                &mut $book.storage,
                $level,
                $slot,
            ),
            Side::Sell => insert_order(
                &mut $book.ask_bitmap,
                &mut $book.ask_best,
                &mut $book.ask_levels,
                &mut $book.storage,
                $level,
                $slot,
            ),
        }
    };
}

macro_rules! remove_from_side {
    ($book:expr, $side:expr, $level:expr, $slot:expr) => {
        match $side {
            Side::Buy => remove_order(
                &mut $book.bid_bitmap,
                &mut $book.bid_best,
                &mut $book.bid_levels,
                &mut $book.storage,
                $level,
                $slot,
            ),
            Side::Sell => remove_order(
                &mut $book.ask_bitmap,
                &mut $book.ask_best,
                &mut $book.ask_levels,
                &mut $book.storage,
                $level,
                $slot,
            ),
        }
    };
}

fn reject(book: &mut OrderBook, id: u32, owner: u32, reason: RejectReason) {
    book.events.record(Event::Reject { id, owner, reason });
}

fn validate_new(book: &OrderBook, order: &NewOrder) -> Result<(), RejectReason> {
    if order.id >= RESERVED_ID {
        return Err(RejectReason::BadId);
    }
    if order.id >= book.config.max_orders {
        return Err(RejectReason::IdTooLarge);
    }
    if order.owner == RESERVED_OWNER {
        return Err(RejectReason::BadOwner);
    }
    if let Some(slot) = book.storage.slot_for_id(order.id) {
        if book.storage.is_active(slot) {
            return Err(RejectReason::DupId);
        }
    }
    if !book.grid.is_valid_price(order.price_ticks) {
        return Err(RejectReason::PriceBad);
    }
    if order.qty <= 0 || order.qty > crate::config::MAX_QTY {
        return Err(RejectReason::QtyBad);
    }
    Ok(())
}

/// `true` iff a resting order at `level` on the opposite side would
/// cross against a new order of `side` at `price_ticks`.
fn crosses(side: Side, taker_price: i64, level_price: i64) -> bool {
    match side {
        Side::Buy => level_price <= taker_price,
        Side::Sell => level_price >= taker_price,
    }
}

/// Read-only dry run: total quantity available on the opposite side that
/// would participate in a cross against `side` at `price_ticks`, capped
/// at `needed` (the caller only needs to know whether it's enough).
fn fillable_liquidity(book: &OrderBook, side: Side, price_ticks: i64, needed: i64) -> i64 {
    let opposite = side.opposite();
    let (bitmap, best) = match opposite {
        Side::Buy => (&book.bid_bitmap, &book.bid_best),
        Side::Sell => (&book.ask_bitmap, &book.ask_best),
    };
    let levels = match opposite {
        Side::Buy => &book.bid_levels,
        Side::Sell => &book.ask_levels,
    };

    let mut total: i64 = 0;
    let mut level = best.best();
    while level != NO_LEVEL {
        let level_price = book.grid.level_to_price(level);
        if !crosses(side, price_ticks, level_price) {
            break;
        }
        let mut slot = levels.front(level);
        while slot != NONE {
            total += book.storage.remaining(slot) as i64;
            if total >= needed {
                return total;
            }
            slot = book.storage.next(slot);
        }
        level = if opposite == Side::Sell {
            bitmap.find_next_set(level + 1)
        } else if level == 0 {
            NO_LEVEL
        } else {
            bitmap.find_prev_set(level - 1)
        };
    }
    total
}

/// Applies a new-order command: validate, optionally cross, optionally
/// post. Returns `Err` only for the fatal [`OrderBookError::SlotsExhausted`]
/// condition on the final GTC posting step; everyday rejections still
/// become `Reject` events, not errors.
pub fn apply_new_order(book: &mut OrderBook, order: NewOrder) -> Result<(), OrderBookError> {
    if let Err(reason) = validate_new(book, &order) {
        reject(book, order.id, order.owner, reason);
        return Ok(());
    }

    if order.post_only {
        let opposite_best = match order.side {
            Side::Buy => book.ask_best.best(),
            Side::Sell => book.bid_best.best(),
        };
        if opposite_best != NO_LEVEL {
            let opp_price = book.grid.level_to_price(opposite_best);
            if crosses(order.side, order.price_ticks, opp_price) {
                reject(book, order.id, order.owner, RejectReason::PostOnlyWouldCross);
                return Ok(());
            }
        }
    }

    if order.tif == TimeInForce::Fok {
        let available = fillable_liquidity(book, order.side, order.price_ticks, order.qty as i64);
        if available < order.qty as i64 {
            reject(book, order.id, order.owner, RejectReason::FokNoFill);
            return Ok(());
        }
    }

    let policy = book.config.stp_policy;
    let mut remaining = order.qty;
    let mut stp_abandoned = false;

    'crossing: loop {
        if remaining == 0 {
            break;
        }
        let opposite = order.side.opposite();
        let opposite_best = match opposite {
            Side::Buy => book.bid_best.best(),
            Side::Sell => book.ask_best.best(),
        };
        if opposite_best == NO_LEVEL {
            break;
        }
        let level_price = book.grid.level_to_price(opposite_best);
        if !crosses(order.side, order.price_ticks, level_price) {
            break;
        }

        let level = opposite_best;
        let level_order_count = match opposite {
            Side::Buy => book.bid_levels.count(level),
            Side::Sell => book.ask_levels.count(level),
        };

        let mut iterations = 0u32;
        while iterations < level_order_count {
            iterations += 1;
            if remaining == 0 {
                break;
            }
            let maker_slot = match opposite {
                Side::Buy => book.bid_levels.front(level),
                Side::Sell => book.ask_levels.front(level),
            };
            if maker_slot == NONE {
                break;
            }
            let maker_id = book.storage.id(maker_slot);
            let maker_owner = book.storage.owner(maker_slot);
            let maker_remaining = book.storage.remaining(maker_slot);

            match stp::check(policy, order.owner, maker_owner) {
                StpOutcome::CancelTaker => {
                    stp_abandoned = true;
                    break 'crossing;
                }
                StpOutcome::DecrementMaker => {
                    // Reduce the maker by what the taker would have
                    // consumed, but emit no trade and leave the taker's
                    // remaining quantity untouched (spec.md §4.5).
                    let reduce_qty = maker_remaining.min(remaining);
                    let maker_left = maker_remaining - reduce_qty;
                    if maker_left == 0 {
                        remove_from_side!(book, opposite, level, maker_slot);
                        book.storage.free(maker_slot);
                        book.events.record(Event::Filled {
                            id: maker_id,
                            owner: maker_owner,
                        });
                    } else {
                        book.storage.set_remaining(maker_slot, maker_left);
                        book.events.record(Event::Reduced {
                            id: maker_id,
                            owner: maker_owner,
                            new_remaining: maker_left,
                        });
                    }
                    continue;
                }
                StpOutcome::Proceed => {}
            }

            let trade_qty = maker_remaining.min(remaining);
            book.events.record(Event::Trade {
                maker_id,
                maker_owner,
                taker_id: order.id,
                taker_owner: order.owner,
                side: order.side,
                price_ticks: level_price,
                qty: trade_qty,
            });
            remaining -= trade_qty;
            let maker_left = maker_remaining - trade_qty;
            if maker_left == 0 {
                remove_from_side!(book, opposite, level, maker_slot);
                book.storage.free(maker_slot);
                book.events.record(Event::Filled {
                    id: maker_id,
                    owner: maker_owner,
                });
            } else {
                book.storage.set_remaining(maker_slot, maker_left);
            }
        }
    }

    if remaining == 0 {
        book.events.record(Event::Filled {
            id: order.id,
            owner: order.owner,
        });
        return Ok(());
    }

    if stp_abandoned {
        reject(book, order.id, order.owner, RejectReason::StpCancelTaker);
        return Ok(());
    }

    if order.tif == TimeInForce::Ioc {
        if remaining < order.qty {
            // Partial fill: some quantity traded, the rest is discarded
            // rather than posted (spec.md §4.5 step 5).
            book.events.record(Event::Filled {
                id: order.id,
                owner: order.owner,
            });
        } else {
            reject(book, order.id, order.owner, RejectReason::IocNoFill);
        }
        return Ok(());
    }

    // GTC remainder rests on the book. `validate_new` rejects any id
    // outside `[0, max_orders)` or already active, so a full book leaves
    // no valid id an incoming order could use — exhaustion is not
    // reachable from here, only from `restore_resting_order`, which
    // bypasses that gate. Still propagated rather than assumed, since a
    // fatal condition must never be masked (`spec.md` §7).
    let level = book.grid.price_to_level(order.price_ticks);
    let slot = book
        .storage
        .allocate(order.id, order.owner, order.side, level, remaining)
        .ok_or(OrderBookError::SlotsExhausted)?;
    insert_into_side!(book, order.side, level, slot);
    book.events.record(Event::Ack {
        id: order.id,
        owner: order.owner,
    });
    Ok(())
}

pub fn apply_cancel(book: &mut OrderBook, cancel: CancelOrder) {
    let slot = match book.storage.slot_for_id(cancel.id) {
        Some(s) if book.storage.is_active(s) => s,
        _ => {
            reject(book, cancel.id, cancel.owner, RejectReason::NotFound);
            return;
        }
    };
    if book.storage.owner(slot) != cancel.owner {
        reject(book, cancel.id, cancel.owner, RejectReason::NotFound);
        return;
    }

    let side = book.storage.side(slot);
    let level = book.storage.level(slot);
    remove_from_side!(book, side, level, slot);
    book.storage.free(slot);
    book.events.record(Event::Canceled {
        id: cancel.id,
        owner: cancel.owner,
    });
}

pub fn apply_replace(book: &mut OrderBook, replace: ReplaceOrder) {
    let slot = match book.storage.slot_for_id(replace.id) {
        Some(s) if book.storage.is_active(s) => s,
        _ => {
            reject(book, replace.id, replace.owner, RejectReason::NotFound);
            return;
        }
    };
    if book.storage.owner(slot) != replace.owner {
        reject(book, replace.id, replace.owner, RejectReason::NotFound);
        return;
    }

    let current_remaining = book.storage.remaining(slot) as i64;
    let new_qty = current_remaining + replace.qty_delta as i64;
    if new_qty < 0 {
        reject(book, replace.id, replace.owner, RejectReason::BadDelta);
        return;
    }
    if new_qty > crate::config::MAX_QTY as i64 {
        reject(book, replace.id, replace.owner, RejectReason::QtyOverflow);
        return;
    }
    if new_qty == 0 {
        // wantQty = 0 is treated as a cancel (spec.md §4.5).
        let side = book.storage.side(slot);
        let level = book.storage.level(slot);
        remove_from_side!(book, side, level, slot);
        book.storage.free(slot);
        book.events.record(Event::Canceled {
            id: replace.id,
            owner: replace.owner,
        });
        return;
    }

    let side = book.storage.side(slot);
    let current_level = book.storage.level(slot);
    let new_price_ticks = replace
        .new_price_ticks
        .unwrap_or_else(|| book.grid.level_to_price(current_level));
    if !book.grid.is_valid_price(new_price_ticks) {
        reject(book, replace.id, replace.owner, RejectReason::PriceBad);
        return;
    }
    let new_level = book.grid.price_to_level(new_price_ticks);
    let new_qty = new_qty as i32;

    if new_level == current_level && replace.qty_delta <= 0 {
        // Size-down-in-place: keeps FIFO priority at the same level.
        book.storage.set_remaining(slot, new_qty);
    } else {
        // Reprice or size-up: loses priority, reinserted at the tail.
        remove_from_side!(book, side, current_level, slot);
        book.storage.set_level(slot, new_level);
        book.storage.set_remaining(slot, new_qty);
        insert_into_side!(book, side, new_level, slot);
    }

    book.events.record(Event::Reduced {
        id: replace.id,
        owner: replace.owner,
        new_remaining: new_qty,
    });
}

/// Re-inserts a resting order during snapshot load, bypassing
/// validation, crossing, and event emission entirely. Callers must
/// invoke this in the snapshot's recorded FIFO order per level so
/// priority is reconstructed exactly (`spec.md` §6).
///
/// Unlike `apply_new_order`, this path is reachable for
/// [`OrderBookError::SlotsExhausted`]: a snapshot's resting-order count
/// is whatever was serialized, not bounded by the book it's being
/// restored into (a snapshot taken under a larger `max_orders`, or a
/// corrupted file, can legitimately overflow the target's capacity).
pub(crate) fn restore_resting_order(
    book: &mut OrderBook,
    id: u32,
    owner: u32,
    side: Side,
    price_ticks: i64,
    qty: i32,
) -> Result<(), OrderBookError> {
    let level = book.grid.price_to_level(price_ticks);
    let slot = book
        .storage
        .allocate(id, owner, side, level, qty)
        .ok_or(OrderBookError::SlotsExhausted)?;
    insert_into_side!(book, side, level, slot);
    Ok(())
}
