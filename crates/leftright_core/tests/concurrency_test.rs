//! Concurrency tests: many reader threads against one writer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const READERS: usize = 32;
const KEYS: u64 = 1000;

/// Value stored under `key` in generation `generation`.
///
/// The text repeats the key so a torn or mixed-up value cannot parse back.
fn encode(key: u64, generation: u64) -> String {
    format!("{key}:{generation}:{key}")
}

fn decode(value: &str) -> (u64, u64, u64) {
    let mut parts = value.split(':').map(|p| p.parse::<u64>().unwrap());
    (
        parts.next().unwrap(),
        parts.next().unwrap(),
        parts.next().unwrap(),
    )
}

#[test]
fn test_no_data_race() {
    let (reader, mut writer) = leftright_core::new::<u64, String>();
    let readers: Vec<_> = (0..READERS).map(|_| reader.clone()).collect();

    // Highest generation the writer is about to publish.
    let announced = Arc::new(AtomicU64::new(0));
    let start = Arc::new(Barrier::new(READERS + 1));
    let done = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = readers
        .into_iter()
        .map(|reader| {
            let announced = Arc::clone(&announced);
            let start = Arc::clone(&start);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                start.wait();
                let mut hits = 0u64;
                while !done.load(Ordering::Acquire) {
                    for key in 0..KEYS {
                        if let Some(value) = reader.get(&key) {
                            let (k1, generation, k2) = decode(&value);
                            assert_eq!((k1, k2), (key, key), "torn value {value}");
                            assert!(generation <= announced.load(Ordering::Acquire));
                            hits += 1;
                        }
                    }
                }
                hits
            })
        })
        .collect();

    start.wait();
    for generation in 1..=5 {
        for key in 0..KEYS {
            writer.insert(key, encode(key, generation));
        }
        announced.store(generation, Ordering::Release);
        writer.publish();
    }
    for key in 0..KEYS {
        writer.remove(key);
    }
    writer.publish();
    done.store(true, Ordering::Release);

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(reader.len(), 0);
    assert_eq!(writer.stats().publishes, 6);
}

#[test]
fn test_interleaved_writer_loop() {
    let (reader, mut writer) = leftright_core::new::<u64, u64>();
    let done = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let reader = reader.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    for key in 0..64 {
                        // Values are always key * 7 or key * 7 + 1, never anything else.
                        if let Some(value) = reader.get(&key) {
                            assert!(value == key * 7 || value == key * 7 + 1);
                        }
                    }
                    let len = reader.len();
                    assert!(len <= 64);
                }
            })
        })
        .collect();

    for round in 0..500u64 {
        for key in 0..64 {
            if (key + round) % 3 == 0 {
                writer.remove(key);
            } else {
                writer.insert(key, key * 7 + round % 2);
            }
        }
        writer.publish();
    }
    done.store(true, Ordering::Release);

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_readers_never_wait_on_unpublished_writes() {
    let (reader, mut writer) = leftright_core::new::<u64, u64>();
    writer.insert(0, 0);
    writer.publish();

    let writing = Arc::new(AtomicBool::new(true));
    let writer_thread = {
        let writing = Arc::clone(&writing);
        thread::spawn(move || {
            // Keeps mutating without ever publishing.
            let mut key = 1;
            loop {
                writer.insert(key, key);
                writer.remove(key - 1);
                key += 1;
                if !writing.load(Ordering::Acquire) {
                    break;
                }
            }
            writer
        })
    };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let reader = reader.clone();
            thread::spawn(move || {
                let started = Instant::now();
                for _ in 0..100_000 {
                    assert_eq!(reader.get(&0), Some(0));
                }
                started.elapsed()
            })
        })
        .collect();

    for handle in handles {
        let elapsed = handle.join().unwrap();
        assert!(elapsed < Duration::from_secs(30));
    }

    writing.store(false, Ordering::Release);
    let mut writer = writer_thread.join().unwrap();
    assert_eq!(reader.len(), 1);

    writer.publish();
    assert_eq!(reader.get(&0), None);
    assert_eq!(reader.len(), 1);
}

#[test]
fn test_readers_come_and_go_during_publishes() {
    let (reader, mut writer) = leftright_core::new::<u32, u32>();
    let done = Arc::new(AtomicBool::new(false));

    let churn = {
        let reader = reader.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut created = 0u32;
            loop {
                let fresh = reader.clone();
                let _ = fresh.get(&1);
                fresh.release();
                created += 1;
                if done.load(Ordering::Acquire) {
                    break;
                }
            }
            created
        })
    };

    for round in 0..200 {
        writer.insert(1, round);
        writer.publish();
    }
    done.store(true, Ordering::Release);

    assert!(churn.join().unwrap() > 0);
    assert_eq!(reader.get(&1), Some(199));
    assert_eq!(writer.reader_count(), 1);
}
