use std::time::{Duration, Instant};

use basalt_icc::{AttachOptions, MessageQueue, MessageType};
use basalt_perf::{make_test_md, temp_shm_path};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn open_queue(path: &str, capacity: u32) -> MessageQueue {
    let _ = std::fs::remove_file(path);
    MessageQueue::open(path, capacity, 32, 1, AttachOptions::default())
        .expect("failed to create queue")
}

/// Produce in bursts of `capacity - 1`, draining untimed between bursts, so
/// the measurement never hits the backpressured path.
fn bench_produce(c: &mut Criterion) {
    let path = temp_shm_path("crit_produce");
    let mut queue = open_queue(&path, 1024);
    let payload = make_test_md().to_bytes();
    let mut buf = vec![0u8; queue.element_size() as usize];
    let burst = (queue.capacity() - 1) as u64;

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("produce", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            let mut remaining = iters;
            while remaining > 0 {
                let batch = remaining.min(burst);
                let start = Instant::now();
                for _ in 0..batch {
                    queue
                        .produce(MessageType::MARKET_DATA, black_box(&payload))
                        .unwrap();
                }
                total += start.elapsed();
                for _ in 0..batch {
                    queue.consume(0, &mut buf).unwrap();
                }
                remaining -= batch;
            }
            total
        });
    });

    drop(group);
    drop(queue);
}

fn bench_consume_data(c: &mut Criterion) {
    let path = temp_shm_path("crit_consume");
    let mut queue = open_queue(&path, 1024);
    let payload = make_test_md().to_bytes();
    let mut buf = vec![0u8; queue.element_size() as usize];
    let burst = (queue.capacity() - 1) as u64;

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("consume (data)", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            let mut remaining = iters;
            while remaining > 0 {
                let batch = remaining.min(burst);
                for _ in 0..batch {
                    queue
                        .produce(MessageType::MARKET_DATA, &payload)
                        .unwrap();
                }
                let start = Instant::now();
                for _ in 0..batch {
                    black_box(queue.consume(0, &mut buf).unwrap());
                }
                total += start.elapsed();
                remaining -= batch;
            }
            total
        });
    });

    drop(group);
    drop(queue);
}

fn bench_consume_empty(c: &mut Criterion) {
    let path = temp_shm_path("crit_empty");
    let mut queue = open_queue(&path, 1024);
    let mut buf = vec![0u8; queue.element_size() as usize];

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("consume (empty)", |b| {
        b.iter(|| black_box(queue.consume(0, &mut buf).unwrap()));
    });

    drop(group);
    drop(queue);
}

fn bench_round_trip(c: &mut Criterion) {
    let path = temp_shm_path("crit_rt");
    let mut queue = open_queue(&path, 1024);
    let payload = make_test_md().to_bytes();
    let mut buf = vec![0u8; queue.element_size() as usize];

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("round_trip", |b| {
        b.iter(|| {
            queue
                .produce(MessageType::MARKET_DATA, black_box(&payload))
                .unwrap();
            black_box(queue.consume(0, &mut buf).unwrap());
        });
    });

    drop(group);
    drop(queue);
}

fn bench_round_trip_capacities(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_capacity");
    group.throughput(Throughput::Elements(1));

    for &capacity in &[1024u32, 4096, 16384, 65536] {
        let path = temp_shm_path(&format!("crit_cap_{capacity}"));
        let mut queue = open_queue(&path, capacity);
        let payload = make_test_md().to_bytes();
        let mut buf = vec![0u8; queue.element_size() as usize];

        group.bench_function(format!("round_trip_cap_{capacity}"), |b| {
            b.iter(|| {
                queue
                    .produce(MessageType::MARKET_DATA, black_box(&payload))
                    .unwrap();
                black_box(queue.consume(0, &mut buf).unwrap());
            });
        });

        drop(queue);
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_produce,
    bench_consume_data,
    bench_consume_empty,
    bench_round_trip,
    bench_round_trip_capacities,
);
criterion_main!(benches);
