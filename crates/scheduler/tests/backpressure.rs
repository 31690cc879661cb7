//! Integration tests for scheduler backpressure under concurrent producers.

use hashgraph_scheduler::{SchedulerConfig, SequentialScheduler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Several producers hammer a small scheduler with `put`. Every task must be
/// handled, in per-producer order, and the unhandled count must never pass
/// the capacity.
#[test]
fn test_put_bounds_outstanding_work() {
    const PRODUCERS: u64 = 4;
    const TASKS: u64 = 500;
    const CAPACITY: usize = 8;

    let peak = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(Mutex::new(Vec::new()));

    let scheduler = {
        let handled = Arc::clone(&handled);
        SequentialScheduler::spawn(
            SchedulerConfig::new("bounded")
                .with_unhandled_task_capacity(CAPACITY)
                .with_sleep_duration(Duration::from_micros(100)),
            move |task: (u64, u64)| {
                handled.lock().unwrap().push(task);
            },
        )
        .unwrap()
    };
    let scheduler = Arc::new(scheduler);

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let scheduler = Arc::clone(&scheduler);
            let peak = Arc::clone(&peak);
            std::thread::spawn(move || {
                for seq in 0..TASKS {
                    scheduler.put((producer, seq)).unwrap();
                    peak.fetch_max(scheduler.unprocessed_task_count(), Ordering::Relaxed);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    scheduler.flush().unwrap();

    let handled = handled.lock().unwrap();
    assert_eq!(handled.len() as u64, PRODUCERS * TASKS);
    for producer in 0..PRODUCERS {
        let seqs: Vec<u64> = handled
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, s)| *s)
            .collect();
        assert_eq!(seqs, (0..TASKS).collect::<Vec<_>>());
    }
    assert!(peak.load(Ordering::Relaxed) <= CAPACITY);
}

/// `offer` drops work instead of waiting; whatever it accepts is handled.
#[test]
fn test_offer_sheds_load() {
    let accepted = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(AtomicUsize::new(0));

    let scheduler = {
        let handled = Arc::clone(&handled);
        SequentialScheduler::spawn(
            SchedulerConfig::new("shedding").with_unhandled_task_capacity(4),
            move |_: u32| {
                std::thread::sleep(Duration::from_micros(200));
                handled.fetch_add(1, Ordering::Relaxed);
            },
        )
        .unwrap()
    };

    for i in 0..1_000 {
        if scheduler.offer(i) {
            accepted.fetch_add(1, Ordering::Relaxed);
        }
    }
    scheduler.flush().unwrap();

    let accepted = accepted.load(Ordering::Relaxed);
    assert!(accepted < 1_000, "a slow handler should shed some offers");
    assert_eq!(handled.load(Ordering::Relaxed), accepted);
}
