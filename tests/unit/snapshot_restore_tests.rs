//! End-to-end WAL + snapshot persistence through the public API
//! (`feature = "journal"`): snapshot a live book, append further
//! commands to a WAL, and confirm `Wal::recover` reconstructs the exact
//! state a crash-free run would have reached.

use lob_core::prelude::*;
use tempfile::tempdir;

fn config() -> BookConfig {
    BookConfig {
        tick: 1,
        pmin: 0,
        pmax: 1_000,
        max_orders: 32,
        stp_policy: StpPolicy::Off,
    }
}

fn order(id: u32, owner: u32, side: Side, price: i64, qty: i32) -> NewOrder {
    NewOrder {
        owner,
        id,
        side,
        price_ticks: price,
        qty,
        tif: TimeInForce::Gtc,
        post_only: false,
        reduce_only: false,
    }
}

#[test]
fn snapshot_then_wal_recover_matches_an_unbroken_run() {
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join("journal.wal");

    // Reference run: everything applied straight through, no crash.
    let mut reference = OrderBook::new(config()).unwrap();
    reference.new_order(order(0, 1, Side::Sell, 100, 10)).unwrap();
    reference.new_order(order(1, 2, Side::Sell, 101, 5)).unwrap();
    reference.new_order(order(2, 3, Side::Buy, 100, 3)).unwrap();
    reference
        .replace(ReplaceOrder {
            owner: 2,
            id: 1,
            new_price_ticks: None,
            qty_delta: -2,
        })
        .unwrap();
    reference.cancel(CancelOrder { owner: 1, id: 0 }).unwrap();

    // Recovery run: snapshot taken after the first three commands, the
    // remaining two only durable in the WAL.
    let mut live = OrderBook::new(config()).unwrap();
    live.new_order(order(0, 1, Side::Sell, 100, 10)).unwrap();
    live.new_order(order(1, 2, Side::Sell, 101, 5)).unwrap();
    live.new_order(order(2, 3, Side::Buy, 100, 3)).unwrap();
    let mut snapshot_buf = Vec::new();
    write_snapshot(&live, &mut snapshot_buf).unwrap();

    let mut wal = Wal::create(&wal_path, 8).unwrap();
    wal.append(
        Command::Replace(ReplaceOrder {
            owner: 2,
            id: 1,
            new_price_ticks: None,
            qty_delta: -2,
        }),
        4,
    )
    .unwrap();
    wal.append(Command::Cancel(CancelOrder { owner: 1, id: 0 }), 5)
        .unwrap();
    wal.flush().unwrap();
    drop(wal);

    let restored = read_snapshot(&mut &snapshot_buf[..]).unwrap();
    let replay = Wal::recover(restored, &wal_path).unwrap();

    assert_eq!(replay.records_replayed, 2);
    assert_eq!(replay.book.best_ask_price(), reference.best_ask_price());
    assert_eq!(replay.book.resting_summary(), reference.resting_summary());
}

#[test]
fn wal_segment_full_is_reported_not_silently_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.wal");
    let mut wal = Wal::create(&path, 1).unwrap();

    wal.append(Command::Cancel(CancelOrder { owner: 1, id: 0 }), 1)
        .unwrap();
    let err = wal
        .append(Command::Cancel(CancelOrder { owner: 1, id: 1 }), 2)
        .unwrap_err();
    assert!(matches!(err, WalError::SegmentFull));
}

#[test]
fn attached_wal_appends_live_commands_and_recovers_them() {
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join("live.wal");

    // Everything applied straight through, for comparison.
    let mut reference = OrderBook::new(config()).unwrap();
    reference.new_order(order(0, 1, Side::Sell, 100, 10)).unwrap();
    reference.new_order(order(1, 2, Side::Buy, 100, 4)).unwrap();
    reference.cancel(CancelOrder { owner: 1, id: 0 }).unwrap();

    // A book with a WAL attached before any command is submitted: the
    // router appends every command to it, so no separate `wal.append`
    // call is needed at the call site.
    let mut live = OrderBook::new(config()).unwrap();
    live.attach_wal(Wal::create(&wal_path, 8).unwrap());
    live.new_order(order(0, 1, Side::Sell, 100, 10)).unwrap();
    live.new_order(order(1, 2, Side::Buy, 100, 4)).unwrap();
    live.cancel(CancelOrder { owner: 1, id: 0 }).unwrap();
    live.detach_wal().unwrap().flush().unwrap();

    let fresh = OrderBook::new(config()).unwrap();
    let replay = Wal::recover(fresh, &wal_path).unwrap();

    assert_eq!(replay.records_replayed, 3);
    assert_eq!(replay.book.best_bid_price(), reference.best_bid_price());
    assert_eq!(replay.book.best_ask_price(), reference.best_ask_price());
    assert_eq!(replay.book.resting_summary(), reference.resting_summary());
}
