//! Chunk coalescing
//!
//! High-frequency network chunks would otherwise trigger a displayed-path
//! recomputation per chunk. The coalescer gates intermediate flushes to a
//! fixed interval; the final persisted value is always the fully
//! accumulated text regardless of how many flushes were skipped.

use std::time::{Duration, Instant};

/// Minimum spacing between intermediate display flushes.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct ChunkCoalescer {
    interval: Duration,
    last_flush: Option<Instant>,
}

impl ChunkCoalescer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_flush: None,
        }
    }

    /// Whether a flush is due now. The first call always flushes.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        let due = match self.last_flush {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due {
            self.last_flush = Some(now);
        }
        due
    }
}

impl Default for ChunkCoalescer {
    fn default() -> Self {
        Self::new(FLUSH_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_always_flushes() {
        let mut coalescer = ChunkCoalescer::default();
        assert!(coalescer.tick_at(Instant::now()));
    }

    #[test]
    fn ticks_inside_the_interval_are_suppressed() {
        let mut coalescer = ChunkCoalescer::new(Duration::from_millis(10));
        let start = Instant::now();
        assert!(coalescer.tick_at(start));
        assert!(!coalescer.tick_at(start + Duration::from_millis(3)));
        assert!(!coalescer.tick_at(start + Duration::from_millis(9)));
        assert!(coalescer.tick_at(start + Duration::from_millis(10)));
        // The flush timestamp advanced with the accepted tick.
        assert!(!coalescer.tick_at(start + Duration::from_millis(15)));
        assert!(coalescer.tick_at(start + Duration::from_millis(20)));
    }
}
