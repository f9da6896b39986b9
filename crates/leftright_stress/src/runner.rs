//! # Stress Runner
//!
//! ```text
//!   writer (this thread)                readers (N threads)
//!   ────────────────────                ───────────────────
//!   round r:                            loop until done:
//!     insert all  gen 2r-1, publish       get every key
//!     overwrite   gen 2r,   publish       check key, checksum, gen <= announced
//!     remove all,           publish     then: len() must be 0
//! ```
//!
//! `announced` is raised before each publish, so a reader can never see a
//! generation above it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use leftright_core::{PublishStats, ReadHandle, WriteHandle};

use crate::config::StressConfig;
use crate::error::{StressError, StressResult};

/// Value the writer stores. Readers re-derive `check` to catch torn values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Sample {
    key: u64,
    generation: u64,
    check: u64,
}

impl Sample {
    fn new(key: u64, generation: u64) -> Self {
        Self {
            key,
            generation,
            check: checksum(key, generation),
        }
    }
}

fn checksum(key: u64, generation: u64) -> u64 {
    key.rotate_left(17) ^ generation.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Outcome of a successful run.
#[derive(Clone, Copy, Debug)]
pub struct StressReport {
    /// Lookups performed across all readers.
    pub reads: u64,
    /// Lookups that found a value.
    pub hits: u64,
    /// Writer publish statistics.
    pub publish: PublishStats,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

/// Counts one reader thread accumulates.
#[derive(Default)]
struct ReaderTally {
    reads: u64,
    hits: u64,
}

/// Runs one stress cycle and verifies every observation.
///
/// # Errors
///
/// Returns a config error for an invalid `config`, and a consistency error
/// if any reader saw a torn or unpublished value or a non-empty final map.
pub fn run(config: &StressConfig) -> StressResult<StressReport> {
    config.validate()?;
    tracing::info!(
        readers = config.readers,
        keys = config.keys,
        rounds = config.rounds,
        "starting stress run"
    );

    let started = Instant::now();
    let (reader, mut writer) = leftright_core::with_config::<u64, Sample>(&config.map);

    let announced = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicBool::new(false));
    let start = Arc::new(Barrier::new(config.readers + 1));

    let handles: Vec<_> = (0..config.readers)
        .map(|index| {
            let reader = reader.clone();
            let announced = Arc::clone(&announced);
            let done = Arc::clone(&done);
            let start = Arc::clone(&start);
            let keys = config.keys;
            thread::spawn(move || {
                start.wait();
                read_until_done(index, &reader, keys, &announced, &done)
            })
        })
        .collect();
    drop(reader);

    start.wait();
    drive_writer(&mut writer, config, &announced);
    done.store(true, Ordering::Release);

    let mut reads = 0;
    let mut hits = 0;
    let mut first_error = None;
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(tally)) => {
                reads += tally.reads;
                hits += tally.hits;
            }
            Ok(Err(err)) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            Err(_) => {
                if first_error.is_none() {
                    first_error = Some(StressError::ReaderPanicked(index));
                }
            }
        }
    }
    if let Some(err) = first_error {
        tracing::error!(%err, "stress run failed");
        return Err(err);
    }

    let report = StressReport {
        reads,
        hits,
        publish: writer.stats(),
        elapsed: started.elapsed(),
    };
    tracing::info!(
        reads = report.reads,
        hits = report.hits,
        publishes = report.publish.publishes,
        readers_waited = report.publish.readers_waited,
        drain_yields = report.publish.drain_yields,
        elapsed_ms = report.elapsed.as_millis(),
        "stress run passed"
    );
    Ok(report)
}

fn drive_writer(writer: &mut WriteHandle<u64, Sample>, config: &StressConfig, announced: &AtomicU64) {
    for round in 1..=config.rounds {
        for generation in [round * 2 - 1, round * 2] {
            for key in 0..config.keys {
                writer.insert(key, Sample::new(key, generation));
            }
            announced.store(generation, Ordering::Release);
            writer.publish();
        }

        for key in 0..config.keys {
            writer.remove(key);
        }
        writer.publish();
        tracing::debug!(round, "stress round complete");
    }
}

fn read_until_done(
    index: usize,
    reader: &ReadHandle<u64, Sample>,
    keys: u64,
    announced: &AtomicU64,
    done: &AtomicBool,
) -> StressResult<ReaderTally> {
    let torn = |key: u64, detail: String| StressError::TornRead {
        reader: index,
        key,
        detail,
    };

    let mut tally = ReaderTally::default();
    // One more full pass after `done` so the final state is read too.
    let mut last_pass = false;
    while !last_pass {
        last_pass = done.load(Ordering::Acquire);
        for key in 0..keys {
            tally.reads += 1;
            let Some(sample) = reader.get(&key) else {
                continue;
            };
            tally.hits += 1;

            if sample.key != key {
                return Err(torn(key, format!("stored under key {}", sample.key)));
            }
            if sample.check != checksum(sample.key, sample.generation) {
                return Err(torn(key, format!("checksum mismatch in {sample:?}")));
            }
            let ceiling = announced.load(Ordering::Acquire);
            if sample.generation > ceiling {
                return Err(torn(
                    key,
                    format!("generation {} not yet announced ({ceiling})", sample.generation),
                ));
            }
        }
    }

    let len = reader.len();
    if len != 0 {
        return Err(StressError::NotConverged { reader: index, len });
    }
    Ok(tally)
}
