//! Integration tests for publish visibility.
//!
//! Mirrors how the map is used in practice: a writer thread and reader
//! threads stepping through phases separated by barriers.

use std::sync::{Arc, Barrier};
use std::thread;

use leftright_core::{LeftRightConfig, ReadHandle};

#[test]
fn test_single_reader_phases() {
    let (reader, mut writer) = leftright_core::new();
    // Phase boundaries: writes done / reads checked / published / checked / published.
    let phase = Arc::new(Barrier::new(2));

    let writer_thread = {
        let phase = Arc::clone(&phase);
        thread::spawn(move || {
            writer.insert("foo", "hello");
            writer.insert("bar", "world");
            phase.wait(); // 1: unpublished writes in place
            phase.wait(); // 2: reader saw nothing

            writer.publish();
            writer.insert("baz", "xxx");
            phase.wait(); // 3: first publish done, baz pending
            phase.wait(); // 4: reader checked

            writer.publish();
            phase.wait(); // 5: second publish done
        })
    };

    let reader_thread = {
        let phase = Arc::clone(&phase);
        thread::spawn(move || {
            phase.wait(); // 1
            assert_eq!(reader.get("foo"), None);
            assert_eq!(reader.get("bar"), None);
            phase.wait(); // 2

            phase.wait(); // 3
            assert_eq!(reader.get("foo"), Some("hello"));
            assert_eq!(reader.get("bar"), Some("world"));
            assert_eq!(reader.get("baz"), None);
            phase.wait(); // 4

            phase.wait(); // 5
            assert_eq!(reader.get("foo"), Some("hello"));
            assert_eq!(reader.get("bar"), Some("world"));
            assert_eq!(reader.get("baz"), Some("xxx"));
            reader.release();
        })
    };

    writer_thread.join().unwrap();
    reader_thread.join().unwrap();
}

#[test]
fn test_multi_reader_overwrite_and_remove() {
    const READERS: usize = 8;

    let (reader, mut writer) = leftright_core::new();
    let readers: Vec<ReadHandle<&str, &str>> = (0..READERS).map(|_| reader.clone()).collect();
    drop(reader);

    writer.insert("foo", "hello");
    writer.insert("bar", "world");
    writer.publish();

    // Every reader checks the first state, then waits for the second publish.
    let checked = Arc::new(Barrier::new(READERS + 1));
    let published = Arc::new(Barrier::new(READERS + 1));

    let handles: Vec<_> = readers
        .into_iter()
        .map(|reader| {
            let checked = Arc::clone(&checked);
            let published = Arc::clone(&published);
            thread::spawn(move || {
                assert_eq!(reader.get("foo"), Some("hello"));
                assert_eq!(reader.get("bar"), Some("world"));
                assert_eq!(reader.get("baz"), None);
                checked.wait();

                published.wait();
                assert_eq!(reader.get("foo"), None);
                assert_eq!(reader.get("bar"), Some("yyy"));
                assert_eq!(reader.get("baz"), Some("xxx"));
                assert_eq!(reader.len(), 2);
            })
        })
        .collect();

    checked.wait();
    writer.remove("foo");
    writer.insert("bar", "yyy");
    writer.insert("baz", "xxx");
    writer.publish();
    published.wait();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(writer.reader_count(), 0);
}

#[test]
fn test_net_effect_of_sequence() {
    let (reader, mut writer) = leftright_core::new::<u32, u32>();

    for i in 0..100 {
        writer.insert(i, i);
    }
    for i in (0..100).step_by(2) {
        writer.remove(i);
    }
    for i in (1..100).step_by(4) {
        writer.insert(i, i * 10);
    }
    writer.publish();

    assert_eq!(reader.len(), 50);
    for i in 0..100 {
        let expected = match i {
            _ if i % 2 == 0 => None,
            _ if i % 4 == 1 => Some(i * 10),
            _ => Some(i),
        };
        assert_eq!(reader.get(&i), expected, "key {i}");
    }

    // Nothing issued after the publish leaks through before the next one.
    writer.insert(1000, 1);
    writer.remove(1);
    assert_eq!(reader.get(&1000), None);
    assert_eq!(reader.get(&1), Some(10));
    assert_eq!(reader.len(), 50);

    writer.publish();
    assert_eq!(reader.get(&1000), Some(1));
    assert_eq!(reader.get(&1), None);
}

#[test]
fn test_repeated_publishes_stay_consistent() {
    let (reader, mut writer) = leftright_core::new::<u32, u32>();

    // Each publish exposes the other slot; both must track the full history.
    for round in 0..10 {
        writer.insert(round, round);
        writer.publish();
        for seen in 0..=round {
            assert_eq!(reader.get(&seen), Some(seen));
        }
        assert_eq!(reader.len() as u32, round + 1);
    }
}

#[test]
fn test_convergence_to_empty() {
    let (reader, mut writer) = leftright_core::new::<u64, String>();
    let others: Vec<_> = (0..4).map(|_| reader.clone()).collect();

    for i in 0..500 {
        writer.insert(i, format!("value-{i}"));
    }
    writer.publish();
    assert_eq!(reader.len(), 500);

    for i in 0..500 {
        writer.remove(i);
    }
    writer.publish();

    assert_eq!(reader.len(), 0);
    assert!(reader.is_empty());
    for other in &others {
        assert_eq!(other.len(), 0);
    }
    // A handle created after the fact sees the same state.
    assert!(writer.reader().is_empty());
}

#[test]
fn test_clone_independence() {
    let (reader, mut writer) = leftright_core::new();
    writer.insert("k", 1);
    writer.publish();

    let clone = reader.clone();
    assert_eq!(clone.get("k"), reader.get("k"));
    assert_ne!(clone.epoch_id(), reader.epoch_id());

    reader.release();
    writer.insert("k", 2);
    writer.publish();

    assert_eq!(clone.get("k"), Some(2));
    assert_eq!(writer.reader_count(), 1);
}

#[test]
fn test_with_config() {
    let config = LeftRightConfig::from_toml_str("initial_capacity = 32\nstall_warn_yields = 5").unwrap();
    let (reader, mut writer) = leftright_core::with_config(&config);

    writer.insert(1u8, 'a');
    writer.publish();
    assert_eq!(reader.get(&1), Some('a'));
}
