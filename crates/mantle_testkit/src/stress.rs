//! Stress tests for Mantle chunks.
//!
//! These helpers hammer a single chunk from many threads and report what
//! they observed, so tests can assert on the concurrency guarantees.

use crate::fixtures::{BlobAdapter, BlobSection};
use mantle_core::{Chunk, ChunkConfig, ChunkError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration,
        }
    }

    /// Operations per second.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_ops as f64 / secs
        } else {
            0.0
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of independent rounds.
    pub rounds: usize,
    /// Section slots per chunk.
    pub capacity: u8,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            rounds: 100,
            capacity: 16,
        }
    }
}

/// Outcome of racing `get_or_create` on empty slots.
#[derive(Debug, Clone, Default)]
pub struct CreateRaceReport {
    /// Rounds in which some caller got a different instance than the stored one.
    pub split_rounds: usize,
    /// Total candidate sections built across all rounds.
    pub sections_built: usize,
    /// Rounds executed.
    pub rounds: usize,
}

/// Races `config.threads` callers on `get_or_create` of the same slot.
///
/// Every round uses a fresh chunk and a different slot index.
pub fn race_get_or_create(config: &StressConfig) -> CreateRaceReport {
    let mut report = CreateRaceReport::default();
    let chunk_config = ChunkConfig::new().capacity(config.capacity.max(1));

    for round in 0..config.rounds {
        let adapter = Arc::new(BlobAdapter::new());
        let chunk = Chunk::new(0, 0, &chunk_config, Arc::clone(&adapter));
        let index = round % chunk.section_count();
        let start = Barrier::new(config.threads);

        let seen: Vec<Arc<BlobSection>> = thread::scope(|s| {
            let handles: Vec<_> = (0..config.threads)
                .map(|_| {
                    s.spawn(|| {
                        start.wait();
                        chunk.get_or_create(index).expect("index within capacity")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("Thread panicked"))
                .collect()
        });

        let stored = chunk.get(index).expect("slot populated");
        if seen.iter().any(|s| !Arc::ptr_eq(s, &stored)) {
            report.split_rounds += 1;
        }
        report.sections_built += adapter.created();
        report.rounds += 1;
    }

    report
}

/// Outcome of closing a chunk while workers keep acquiring holds.
#[derive(Debug, Clone)]
pub struct CloseRaceReport {
    /// Holds acquired and released.
    pub result: StressTestResult,
    /// Holds acquired after `close` had already returned.
    pub late_acquires: usize,
}

/// Runs workers that repeatedly acquire and release holds while the
/// calling thread closes the chunk.
pub fn race_use_against_close(config: &StressConfig) -> CloseRaceReport {
    let chunk = Chunk::new(
        0,
        0,
        &ChunkConfig::new().capacity(config.capacity.max(1)),
        Arc::new(BlobAdapter::new()),
    );
    let closed = AtomicBool::new(false);
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let late = AtomicUsize::new(0);
    let start = Barrier::new(config.threads + 1);

    let began = Instant::now();
    thread::scope(|s| {
        for t in 0..config.threads {
            let (chunk, closed, successful, failed, late, start) =
                (&chunk, &closed, &successful, &failed, &late, &start);
            s.spawn(move || {
                start.wait();
                loop {
                    let closed_before = closed.load(Ordering::SeqCst);
                    match chunk.use_chunk() {
                        Ok(hold) => {
                            if closed_before {
                                late.fetch_add(1, Ordering::SeqCst);
                            }
                            let index = t % hold.section_count();
                            hold.get_or_create(index)
                                .expect("index within capacity")
                                .append(&[1]);
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(ChunkError::Closed) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            break;
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            });
        }

        start.wait();
        thread::sleep(Duration::from_millis(5));
        chunk.close();
        closed.store(true, Ordering::SeqCst);
    });

    CloseRaceReport {
        result: StressTestResult::new(
            successful.load(Ordering::Relaxed),
            failed.load(Ordering::Relaxed),
            began.elapsed(),
        ),
        late_acquires: late.load(Ordering::SeqCst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_never_splits() {
        let config = StressConfig {
            threads: 8,
            rounds: 50,
            capacity: 4,
        };
        let report = race_get_or_create(&config);

        assert_eq!(report.rounds, 50);
        assert_eq!(report.split_rounds, 0);
        assert!(report.sections_built >= report.rounds);
        assert!(report.sections_built <= report.rounds * config.threads);
    }

    #[test]
    fn close_rejects_late_users() {
        let config = StressConfig {
            threads: 4,
            rounds: 1,
            capacity: 4,
        };
        let report = race_use_against_close(&config);

        assert_eq!(report.late_acquires, 0);
        // Every worker ends on exactly one rejected acquire.
        assert_eq!(report.result.failed_ops, config.threads);
    }
}
