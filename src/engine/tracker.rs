// src/engine/tracker.rs

//! Current / peak count of simultaneously running jobs.

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Counts {
    current: usize,
    peak: usize,
}

/// Tracks how many jobs are running and the maximum ever observed.
#[derive(Debug, Default)]
pub struct ConcurrencyTracker {
    counts: Mutex<Counts>,
}

impl ConcurrencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a job as running until the returned guard is dropped.
    pub fn enter(&self) -> RunningGuard<'_> {
        let mut counts = self.counts.lock();
        counts.current += 1;
        counts.peak = counts.peak.max(counts.current);
        RunningGuard { tracker: self }
    }

    fn leave(&self) {
        let mut counts = self.counts.lock();
        counts.current = counts.current.saturating_sub(1);
    }

    pub fn current(&self) -> usize {
        self.counts.lock().current
    }

    pub fn peak(&self) -> usize {
        self.counts.lock().peak
    }
}

/// Decrements the tracker on drop, including when a job path unwinds.
#[derive(Debug)]
pub struct RunningGuard<'a> {
    tracker: &'a ConcurrencyTracker,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.tracker.leave();
    }
}
