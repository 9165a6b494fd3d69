use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flowwatch_core::{
    Broadcaster, EventLog, HealthTracker, KpiAggregator, Liveness, MemoryCounterStore,
    MemoryEventStore,
};
use flowwatch_types::{topics, ProductionCode};

fn aggregator(broadcaster: Arc<Broadcaster>) -> KpiAggregator {
    let events = Arc::new(EventLog::new(
        Arc::new(MemoryEventStore::new()),
        broadcaster.clone(),
        Arc::new(HealthTracker::new()),
    ));
    KpiAggregator::new(Arc::new(MemoryCounterStore::new()), broadcaster, events)
}

/// Benchmark a good-unit event (hot path, no event-log write)
fn bench_apply_good(c: &mut Criterion) {
    let kpi = aggregator(Arc::new(Broadcaster::new()));

    c.bench_function("apply_event_good", |b| {
        b.iter(|| {
            kpi.apply_event(black_box(ProductionCode::LineAGood), None)
                .unwrap();
        });
    });
}

/// Benchmark parsing and applying a raw code
fn bench_apply_raw(c: &mut Criterion) {
    let kpi = aggregator(Arc::new(Broadcaster::new()));

    c.bench_function("apply_raw", |b| {
        b.iter(|| {
            kpi.apply_raw(black_box(" b0 "), None).unwrap();
        });
    });
}

/// Benchmark publishing with a varying number of idle subscribers
fn bench_apply_with_subscribers(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_with_subscribers");

    for count in [0usize, 1, 10, 50].iter() {
        let broadcaster = Arc::new(Broadcaster::with_capacity(1));
        let _subs: Vec<_> = (0..*count)
            .map(|_| broadcaster.subscribe(topics::KPI_SUMMARY))
            .collect();
        let kpi = aggregator(broadcaster);

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                kpi.apply_event(black_box(ProductionCode::LineBGood), None)
                    .unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark the health check used by the status query
fn bench_health_check(c: &mut Criterion) {
    let tracker = HealthTracker::new();
    tracker.mark_success();

    c.bench_function("health_check", |b| {
        b.iter(|| black_box(tracker.is_healthy(black_box(Duration::from_secs(30)))));
    });
}

criterion_group!(
    benches,
    bench_apply_good,
    bench_apply_raw,
    bench_apply_with_subscribers,
    bench_health_check,
);
criterion_main!(benches);
