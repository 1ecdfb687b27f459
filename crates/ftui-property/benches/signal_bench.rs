//! Benchmarks for property change delivery.
//!
//! Run with: cargo bench -p ftui-property --bench signal_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ftui_property::{DirectProperty, PropertyChannel, PropertyOwner, PropertyValue};
use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

struct Gauge {
    level: Cell<u64>,
}

impl PropertyOwner for Gauge {}

fn gauge() -> (Rc<Gauge>, PropertyChannel<u64>) {
    let level = DirectProperty::<Gauge, u64>::new("Level", |g| g.level.get());
    let owner = Rc::new(Gauge {
        level: Cell::new(0),
    });
    let channel = PropertyChannel::direct(&owner, &level);
    (owner, channel)
}

// =============================================================================
// Plain fan-out
// =============================================================================

fn bench_signal_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/signal");

    for subscribers in [1usize, 8, 64] {
        let (owner, channel) = gauge();
        let subs: Vec<_> = (0..subscribers)
            .map(|_| channel.subscribe(|change| {
                black_box(change.is_outdated());
            }))
            .collect();
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("fanout", subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    let next = owner.level.get() + 1;
                    owner.level.set(next);
                    channel.signal(channel.new_change(Some(next - 1), PropertyValue::Value(next)));
                })
            },
        );
        drop(subs);
    }

    group.finish();
}

// =============================================================================
// Adapter path
// =============================================================================

fn bench_value_adapter(c: &mut Criterion) {
    let (owner, channel) = gauge();
    let sink = Rc::new(Cell::new(0u64));
    let sink_c = Rc::clone(&sink);
    let _sub = channel
        .value_adapter()
        .subscribe(move |v: &u64| sink_c.set(*v));

    c.bench_function("adapter/value", |b| {
        b.iter(|| {
            let next = owner.level.get() + 1;
            owner.level.set(next);
            channel.signal(channel.new_change(Some(next - 1), PropertyValue::Value(next)));
            black_box(sink.get())
        })
    });
}

// =============================================================================
// Reentrant burst
// =============================================================================

fn bench_reentrant_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/burst");

    for burst in [1u64, 4, 16] {
        let (owner, channel) = gauge();
        let depth = Rc::new(Cell::new(false));
        let (owner_c, channel_c, depth_c) = (Rc::clone(&owner), channel.clone(), Rc::clone(&depth));
        let _sub = channel.subscribe(move |_| {
            if depth_c.replace(true) {
                return;
            }
            for _ in 0..burst {
                let next = owner_c.level.get() + 1;
                owner_c.level.set(next);
                channel_c.signal(channel_c.new_change(Some(next - 1), PropertyValue::Value(next)));
            }
        });

        group.throughput(Throughput::Elements(burst + 1));
        group.bench_with_input(BenchmarkId::new("nested", burst), &burst, |b, _| {
            b.iter(|| {
                depth.set(false);
                let next = owner.level.get() + 1;
                owner.level.set(next);
                channel.signal(channel.new_change(Some(next - 1), PropertyValue::Value(next)));
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_signal_fanout,
    bench_value_adapter,
    bench_reentrant_burst
);
criterion_main!(benches);
