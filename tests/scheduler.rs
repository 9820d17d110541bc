#[path = "common/mod.rs"]
mod common;

use common::*;
use citytally::{merge_tally, new_tally, Batch, MemorySource, RecordLimits, RecordParser, Scheduler, SourceProvider, Tally};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn tally_of(pairs: &[(&str, i64)]) -> Tally {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Merge is order-independent.
#[test]
fn merge_is_order_independent() {
    let a = tally_of(&[("A", 1)]);
    let b = tally_of(&[("A", 2), ("B", 3)]);

    let mut ab = new_tally();
    merge_tally(&mut ab, a.clone());
    merge_tally(&mut ab, b.clone());

    let mut ba = new_tally();
    merge_tally(&mut ba, b);
    merge_tally(&mut ba, a);

    assert_eq!(to_btree(&ab), expect(&[("A", 3), ("B", 3)]));
    assert_eq!(to_btree(&ab), to_btree(&ba));
}

/// Merging into an accumulator near the `i64` ceiling saturates.
#[test]
fn merge_saturates_at_i64_max() {
    let mut total = tally_of(&[("K", i64::MAX), ("L", 1)]);
    merge_tally(&mut total, tally_of(&[("K", 1), ("L", 2)]));
    assert_eq!(to_btree(&total), expect(&[("K", i64::MAX), ("L", 3)]));
}

/// Huge per-batch sums merged across workers stay at the ceiling, no panic.
#[test]
fn run_with_huge_values_does_not_overflow() {
    let limits = RecordLimits { max_value: i64::MAX, ..RecordLimits::default() };
    let scheduler = Scheduler::new(RecordParser::new(limits), 3).unwrap();
    let line = format!("Big,{}", i64::MAX);
    let batches: Vec<Vec<String>> = (0..6).map(|_| vec![line.clone(), line.clone()]).collect();
    let tally = scheduler.run(&mut MemorySource::new(batches));
    assert_eq!(to_btree(&tally), expect(&[("BIG", i64::MAX)]));
}

#[test]
fn empty_source_yields_empty_tally() {
    let scheduler = Scheduler::new(RecordParser::default(), 4).unwrap();
    let mut source = MemorySource::default();
    assert!(scheduler.run(&mut source).is_empty());
    assert_eq!(source.pulled(), 0);
}

/// Empty batches (e.g. a source unit that failed to read) merge as no-ops.
#[test]
fn empty_batches_are_noops() {
    let scheduler = Scheduler::new(RecordParser::default(), 2).unwrap();
    let mut source = MemorySource::new(vec![vec![], vec!["Rome,5"], vec![], vec![]]);
    let (tally, stats) = scheduler.run_with(&mut source, |_| {});
    assert_eq!(to_btree(&tally), expect(&[("ROME", 5)]));
    assert_eq!(stats.batches, 4);
    assert!(source.is_exhausted());
}

/// Same input, different concurrency bounds: identical result.
#[test]
fn result_does_not_depend_on_concurrency() {
    let batches: Vec<Vec<String>> = (0..40)
        .map(|i| {
            (0..25)
                .map(|j| format!("City_{}, {}", (i * 7 + j) % 13, i + j))
                .collect()
        })
        .collect();

    let serial = Scheduler::new(RecordParser::default(), 1)
        .unwrap()
        .run(&mut MemorySource::new(batches.clone()));

    for n in [2, 3, 8, 64] {
        let parallel = Scheduler::new(RecordParser::default(), n)
            .unwrap()
            .run(&mut MemorySource::new(batches.clone()));
        assert_eq!(to_btree(&parallel), to_btree(&serial), "max_concurrency = {n}");
    }

    let total: i64 = serial.values().sum();
    let expected: i64 = (0..40).flat_map(|i| (0..25).map(move |j| (i + j) as i64)).sum();
    assert_eq!(total, expected);
}

/// Instrumented worker: the number of simultaneously active parse operations
/// never exceeds the bound, even with many more batches than slots.
#[test]
fn concurrency_bound_is_respected() {
    for n in [1usize, 2, 4] {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, p, c) = (active.clone(), peak.clone(), calls.clone());
        let parser = RecordParser::default();
        let scheduler = Scheduler::with_worker(
            move |batch: Batch| {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                c.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                let t = parser.parse_batch(&batch);
                a.fetch_sub(1, Ordering::SeqCst);
                t
            },
            n,
        )
        .unwrap();

        let batches: Vec<Vec<String>> = (0..n * 6).map(|i| vec![format!("Key_{}, 1", i % 3)]).collect();
        let mut source = MemorySource::new(batches);
        let (tally, stats) = scheduler.run_with(&mut source, |_| {});

        assert!(peak.load(Ordering::SeqCst) <= n, "peak {} > {}", peak.load(Ordering::SeqCst), n);
        assert!(stats.peak_in_flight <= n);
        assert_eq!(calls.load(Ordering::SeqCst), n * 6);
        assert_eq!(stats.batches, (n * 6) as u64);
        assert_eq!(tally.values().sum::<i64>(), (n * 6) as i64);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }
}

/// Zero is clamped to a single slot rather than deadlocking.
#[test]
fn zero_concurrency_runs_serially() {
    let scheduler = Scheduler::new(RecordParser::default(), 0).unwrap();
    assert_eq!(scheduler.max_concurrency(), 1);
    let tally = scheduler.run(&mut MemorySource::new(vec![vec!["Oslo,1"], vec!["Oslo,2"]]));
    assert_eq!(to_btree(&tally), expect(&[("OSLO", 3)]));
}

/// Source that counts pulls, for observing backpressure.
struct CountingSource {
    remaining: usize,
    pulled: Arc<AtomicUsize>,
}

impl SourceProvider for CountingSource {
    fn next_batch(&mut self) -> Batch {
        self.remaining -= 1;
        self.pulled.fetch_add(1, Ordering::SeqCst);
        vec!["Gate,1".to_string()]
    }
    fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// With every slot blocked, nothing beyond the first `n` batches is pulled.
#[test]
fn no_batch_is_pulled_while_slots_are_full() {
    let n = 3usize;
    let pulled = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(AtomicUsize::new(0));
    let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();

    let st = started.clone();
    let scheduler = Scheduler::with_worker(
        move |batch: Batch| {
            st.fetch_add(1, Ordering::SeqCst);
            // Blocks until the test drops the sender.
            let _ = gate_rx.recv();
            RecordParser::default().parse_batch(&batch)
        },
        n,
    )
    .unwrap();

    let pl = pulled.clone();
    let handle = thread::spawn(move || {
        let mut source = CountingSource { remaining: 20, pulled: pl };
        scheduler.run(&mut source)
    });

    while started.load(Ordering::SeqCst) < n {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(50));
    assert_eq!(pulled.load(Ordering::SeqCst), n);
    assert_eq!(started.load(Ordering::SeqCst), n);

    drop(gate_tx);
    let tally = handle.join().unwrap();
    assert_eq!(pulled.load(Ordering::SeqCst), 20);
    assert_eq!(to_btree(&tally), expect(&[("GATE", 20)]));
}

/// A panicking task frees its slot: the run finishes, the other batches merge
/// and the lost batch is counted.
#[test]
fn panicking_task_is_counted_and_run_completes() {
    let parser = RecordParser::default();
    let scheduler = Scheduler::with_worker(
        move |batch: Batch| {
            if batch.iter().any(|l| l == "boom") {
                panic!("bad batch");
            }
            parser.parse_batch(&batch)
        },
        1,
    )
    .unwrap();

    let mut source = MemorySource::new(vec![
        batch(&["Oslo,1"]),
        batch(&["boom"]),
        batch(&["Oslo,2"]),
        batch(&["Bergen,5"]),
    ]);
    let (tally, stats) = scheduler.run_with(&mut source, |_| {});
    assert_eq!(to_btree(&tally), expect(&[("BERGEN", 5), ("OSLO", 3)]));
    assert_eq!(stats.lost, 1);
    assert_eq!(stats.batches, 3);
}
