//! Block-height clocks
//!
//! The ledger reads one height per call. `WallClock` derives it from wall
//! time the way chain epochs are estimated; `ManualClock` is driven by
//! hand for tests and local runs.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::BlockHeight;

pub trait BlockClock: Send + Sync {
    fn current_height(&self) -> BlockHeight;
}

/// Height = seconds since genesis / block time
#[derive(Debug, Clone)]
pub struct WallClock {
    genesis_unix: i64,
    block_time_secs: u64,
}

impl WallClock {
    pub fn new(genesis_unix: i64, block_time_secs: u64) -> Self {
        Self {
            genesis_unix,
            block_time_secs: block_time_secs.max(1),
        }
    }

    fn height_at(&self, unix: i64) -> BlockHeight {
        let elapsed = unix.saturating_sub(self.genesis_unix).max(0) as u64;
        elapsed / self.block_time_secs
    }
}

impl BlockClock for WallClock {
    fn current_height(&self) -> BlockHeight {
        self.height_at(chrono::Utc::now().timestamp())
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn new(height: BlockHeight) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    pub fn set(&self, height: BlockHeight) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn advance(&self, blocks: u64) -> BlockHeight {
        self.height.fetch_add(blocks, Ordering::SeqCst) + blocks
    }
}

impl BlockClock for ManualClock {
    fn current_height(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_heights() {
        let clock = WallClock::new(1_000, 600);
        assert_eq!(clock.height_at(1_000), 0);
        assert_eq!(clock.height_at(1_599), 0);
        assert_eq!(clock.height_at(1_600), 1);
        // Before genesis stays at zero
        assert_eq!(clock.height_at(0), 0);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.current_height(), 10);
        assert_eq!(clock.advance(5), 15);
        clock.set(3);
        assert_eq!(clock.current_height(), 3);
    }
}
