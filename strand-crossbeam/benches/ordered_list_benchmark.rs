//! Benchmarks for ConcurrentOrderedList:
//! - sorted and newest-first adds, tombstone + purge cycles, readers under writes
//! - crossbeam-skiplist SkipSet as the lock-free reference point
//!
//! Run with: cargo bench --package strand-crossbeam --bench ordered_list_benchmark

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use crossbeam_skiplist::SkipSet;
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use strand_crossbeam::EpochOrderedList;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// The list is O(n) per sorted add, so keep it well below skiplist sizes.
const OPS_PER_THREAD: usize = 1_000;

/// Keys spread over the key space so sorted adds do not always hit the tail.
fn scattered(t: usize, i: usize) -> i64 {
    ((i * 7919 + t * 104_729) % 1_000_003) as i64
}

// ============================================================================
// Add
// ============================================================================

fn bench_list_sorted_add(thread_count: usize, ops_per_thread: usize) {
    let list: Arc<EpochOrderedList<i64>> = Arc::new(EpochOrderedList::sorted());
    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    list.add(scattered(t, i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_list_front_add(thread_count: usize, ops_per_thread: usize) {
    let list: Arc<EpochOrderedList<i64>> = Arc::new(EpochOrderedList::new());
    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    list.add(scattered(t, i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_skipset_insert(thread_count: usize, ops_per_thread: usize) {
    let set: Arc<SkipSet<i64>> = Arc::new(SkipSet::new());
    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    set.insert(scattered(t, i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Delete + purge
// ============================================================================

/// Tombstone every other key in batches, purging after each batch.
fn bench_list_delete_purge(count: usize, batch: usize) {
    let list: EpochOrderedList<i64> = EpochOrderedList::sorted();
    for i in 0..count as i64 {
        list.add(i);
    }

    let mut lo = 0i64;
    while lo < count as i64 {
        let hi = lo + batch as i64;
        list.delete(|v| *v >= lo && *v < hi && v % 2 == 0, false);
        list.purge();
        lo = hi;
    }
    black_box(list.len());
}

fn bench_skipset_remove(count: usize) {
    let set: SkipSet<i64> = SkipSet::new();
    for i in 0..count as i64 {
        set.insert(i);
    }
    for i in (0..count as i64).step_by(2) {
        set.remove(&i);
    }
    black_box(set.len());
}

// ============================================================================
// Readers under writes
// ============================================================================

/// Reader threads snapshot a pre-filled list while one writer churns it.
fn bench_list_readers(reader_count: usize, rounds: usize) {
    let list: Arc<EpochOrderedList<i64>> = Arc::new(EpochOrderedList::sorted());
    for i in 0..2_000 {
        list.add(i);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let list = Arc::clone(&list);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut i = 0i64;
            while !stop.load(Ordering::Relaxed) {
                let key = (i * 31) % 2_000;
                list.delete(|v| *v == key, true);
                list.add(key);
                if i % 64 == 0 {
                    list.purge();
                }
                i += 1;
            }
        })
    };

    let readers: Vec<_> = (0..reader_count)
        .map(|_| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for _ in 0..rounds {
                    black_box(list.count_where(|v| v % 3 == 0));
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

// ============================================================================
// Criterion benchmark groups
// ============================================================================

fn add_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_benchmark_ordered_list");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("add_benchmark_sorted", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_list_sorted_add(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );

        group.bench_with_input(
            BenchmarkId::new("add_benchmark_front", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_list_front_add(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );

        group.bench_with_input(
            BenchmarkId::new("add_benchmark_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_skipset_insert(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

fn purge_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("purge_benchmark_ordered_list");

    for count in [1_000, 4_000] {
        group.bench_with_input(
            BenchmarkId::new("delete_purge_batch_100", count),
            &count,
            |b, &count| b.iter(|| bench_list_delete_purge(black_box(count), 100)),
        );

        group.bench_with_input(
            BenchmarkId::new("delete_purge_once", count),
            &count,
            |b, &count| b.iter(|| bench_list_delete_purge(black_box(count), count)),
        );

        group.bench_with_input(
            BenchmarkId::new("remove_crossbeam", count),
            &count,
            |b, &count| b.iter(|| bench_skipset_remove(black_box(count))),
        );
    }

    group.finish();
}

fn readers_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("readers_benchmark_ordered_list");
    group.sample_size(20);

    for readers in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("readers_with_writer", readers),
            &readers,
            |b, &readers| b.iter(|| bench_list_readers(black_box(readers), 50)),
        );
    }

    group.finish();
}

criterion_group!(benches, add_benchmark, purge_benchmark, readers_benchmark);
criterion_main!(benches);
