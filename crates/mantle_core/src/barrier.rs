//! Quiescence barrier.

use crate::error::{ChunkError, ChunkResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// A holder-count gate with a one-way close.
///
/// Callers register a hold with [`acquire`](Self::acquire) before bulk work
/// and give it back with [`release`](Self::release). [`close`](Self::close)
/// flips the barrier to closed, which makes every later `acquire` fail, and
/// then waits until all outstanding holds are released.
///
/// ## States
///
/// ```text
/// OPEN ──close()──> CLOSED
/// ```
///
/// There is no way back to `OPEN`.
#[derive(Debug, Default)]
pub struct UseBarrier {
    closed: AtomicBool,
    holders: Mutex<usize>,
    drained: Condvar,
}

impl UseBarrier {
    /// Creates an open barrier with no holders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one hold.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Closed`] if the barrier is closed, including when
    /// it closes while the hold is being registered.
    pub fn acquire(&self) -> ChunkResult<()> {
        if self.is_closed() {
            return Err(ChunkError::Closed);
        }

        *self.holders.lock() += 1;

        // close() may have run between the check and the increment.
        if self.is_closed() {
            self.release();
            return Err(ChunkError::Closed);
        }

        Ok(())
    }

    /// Deregisters one hold and wakes a pending `close` once none remain.
    ///
    /// Each call must pair with a successful [`acquire`](Self::acquire).
    /// [`ChunkHold`](crate::ChunkHold) does this on drop.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if no hold is outstanding. Release builds
    /// leave the count at zero.
    pub fn release(&self) {
        let mut holders = self.holders.lock();
        debug_assert!(*holders > 0, "release without matching acquire");
        *holders = holders.saturating_sub(1);
        if *holders == 0 {
            self.drained.notify_all();
        }
    }

    /// Returns true if any hold is outstanding.
    #[must_use]
    pub fn in_use(&self) -> bool {
        *self.holders.lock() > 0
    }

    /// Returns the number of outstanding holds.
    #[must_use]
    pub fn holders(&self) -> usize {
        *self.holders.lock()
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the barrier and blocks until every hold is released.
    ///
    /// New `acquire` calls fail as soon as the closed flag is set; they are
    /// never blocked. The wait has no timeout and cannot be interrupted.
    /// Calling `close` again is allowed and waits for drain again.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let mut holders = self.holders.lock();
        while *holders > 0 {
            self.drained.wait(&mut holders);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn acquire_and_release() {
        let barrier = UseBarrier::new();
        assert!(!barrier.in_use());

        barrier.acquire().unwrap();
        barrier.acquire().unwrap();
        assert_eq!(barrier.holders(), 2);

        barrier.release();
        assert!(barrier.in_use());
        barrier.release();
        assert!(!barrier.in_use());
    }

    #[test]
    fn close_without_holders_returns() {
        let barrier = UseBarrier::new();
        barrier.close();
        assert!(barrier.is_closed());
    }

    #[test]
    fn acquire_after_close_fails() {
        let barrier = UseBarrier::new();
        barrier.close();

        assert!(matches!(barrier.acquire(), Err(ChunkError::Closed)));
        assert!(!barrier.in_use());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "release without matching acquire")]
    fn unmatched_release_panics_in_debug() {
        UseBarrier::new().release();
    }

    #[test]
    fn close_is_repeatable() {
        let barrier = UseBarrier::new();
        barrier.close();
        barrier.close();
        assert!(barrier.is_closed());
    }

    #[test]
    fn close_waits_for_holders() {
        const HOLDS: usize = 4;

        let barrier = UseBarrier::new();
        for _ in 0..HOLDS {
            barrier.acquire().unwrap();
        }
        let finished = AtomicBool::new(false);

        thread::scope(|s| {
            let closer = s.spawn(|| {
                barrier.close();
                finished.store(true, Ordering::SeqCst);
            });

            while !barrier.is_closed() {
                thread::yield_now();
            }
            assert!(matches!(barrier.acquire(), Err(ChunkError::Closed)));

            for _ in 0..HOLDS {
                thread::sleep(Duration::from_millis(10));
                assert!(!finished.load(Ordering::SeqCst));
                barrier.release();
            }

            closer.join().unwrap();
        });

        assert!(finished.load(Ordering::SeqCst));
        assert!(!barrier.in_use());
    }
}
