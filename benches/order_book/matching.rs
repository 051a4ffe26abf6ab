//! Benchmarks the crossing/posting path at increasing depths. Layout
//! grounded on the teacher's `benches/order_book/*.rs`
//! `register_benchmarks(c: &mut Criterion)` convention, here driven by
//! its own `criterion_main!` since this core's `Cargo.toml` registers
//! each benchmark file as its own `[[bench]]` target.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lob_core::{BookConfig, NewOrder, OrderBook, Side, StpPolicy, TimeInForce};
use std::hint::black_box;

fn config(max_orders: u32) -> BookConfig {
    BookConfig {
        tick: 1,
        pmin: 0,
        pmax: 1_000_000,
        max_orders,
        stp_policy: StpPolicy::Off,
    }
}

/// Builds a book with `depth` resting asks stacked one lot apart
/// starting at price 100, each owned by a distinct owner.
fn book_with_resting_asks(depth: u32) -> OrderBook {
    let mut book = OrderBook::new(config(depth + 1)).unwrap();
    for i in 0..depth {
        book.new_order(NewOrder {
            owner: i,
            id: i,
            side: Side::Sell,
            price_ticks: 100 + i as i64,
            qty: 10,
            tif: TimeInForce::Gtc,
            post_only: false,
            reduce_only: false,
        })
        .unwrap();
    }
    book
}

fn bench_single_level_cross(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching - single level cross");
    for &fifo_depth in &[1u32, 8, 64, 256] {
        group.bench_with_input(
            BenchmarkId::new("cross_one_level", fifo_depth),
            &fifo_depth,
            |b, &depth| {
                b.iter_with_setup(
                    || {
                        let mut book = OrderBook::new(config(depth + 1)).unwrap();
                        for i in 0..depth {
                            book.new_order(NewOrder {
                                owner: i,
                                id: i,
                                side: Side::Sell,
                                price_ticks: 100,
                                qty: 1,
                                tif: TimeInForce::Gtc,
                                post_only: false,
                                reduce_only: false,
                            })
                            .unwrap();
                        }
                        book
                    },
                    |mut book| {
                        black_box(
                            book.new_order(NewOrder {
                                owner: u32::MAX - 1,
                                id: depth,
                                side: Side::Buy,
                                price_ticks: 100,
                                qty: depth as i32,
                                tif: TimeInForce::Gtc,
                                post_only: false,
                                reduce_only: false,
                            })
                            .unwrap(),
                        );
                    },
                );
            },
        );
    }
    group.finish();
}

fn bench_sweep_multiple_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching - multi-level sweep");
    for &levels in &[10u32, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("sweep_levels", levels), &levels, |b, &levels| {
            b.iter_with_setup(
                || book_with_resting_asks(levels),
                |mut book| {
                    black_box(
                        book.new_order(NewOrder {
                            owner: u32::MAX - 1,
                            id: levels,
                            side: Side::Buy,
                            price_ticks: 100 + levels as i64,
                            qty: 10 * levels as i32,
                            tif: TimeInForce::Gtc,
                            post_only: false,
                            reduce_only: false,
                        })
                        .unwrap(),
                    );
                },
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_level_cross, bench_sweep_multiple_levels);
criterion_main!(benches);
