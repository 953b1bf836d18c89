use std::collections::VecDeque;

use crate::config::PrismConfig;
use crate::mem::MemorySubsystem;
use crate::trace::Trace;

/// Per-tile sort completion flags and the render-ready FIFO.
///
/// A tile is enqueued exactly once, on the call that sets the second of its two flags;
/// because marking sets the flag before checking the other one, the enqueue is race-free
/// even when both pools finish the same tile within a single core tick.
#[derive(Debug)]
pub struct TileBoard {
    classified: Vec<bool>,
    reused: Vec<bool>,
    ready: VecDeque<u64>,
}

impl TileBoard {
    pub fn new(num_tiles: u64) -> Self {
        Self {
            classified: vec![false; num_tiles as usize],
            reused: vec![false; num_tiles as usize],
            ready: VecDeque::new(),
        }
    }

    pub fn mark_classified(&mut self, tile_id: u64) {
        self.classified[tile_id as usize] = true;
        if self.reused[tile_id as usize] {
            self.ready.push_back(tile_id);
        }
    }

    pub fn mark_reused(&mut self, tile_id: u64) {
        self.reused[tile_id as usize] = true;
        if self.classified[tile_id as usize] {
            self.ready.push_back(tile_id);
        }
    }

    pub fn pop_ready(&mut self) -> Option<u64> {
        self.ready.pop_front()
    }

    pub fn peek_ready(&self) -> Option<u64> {
        self.ready.front().copied()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }
}

/// Everything the phases share: the immutable trace, the resolved configuration, the
/// memory subsystem they contend for, and the tile readiness board.  Constructed once
/// at startup and threaded through every tick by mutable reference; there is no ambient
/// global state.
pub struct SimContext {
    pub trace: Trace,
    pub config: PrismConfig,
    pub mem: MemorySubsystem,
    pub tiles: TileBoard,
}

impl SimContext {
    pub fn new(config: PrismConfig, trace: Trace) -> Self {
        let mem = MemorySubsystem::new(&config.dram, config.other.cache_size);
        let tiles = TileBoard::new(trace.num_tiles);
        Self {
            trace,
            config,
            mem,
            tiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_flag_enqueues_exactly_once() {
        let mut board = TileBoard::new(4);
        board.mark_classified(2);
        assert_eq!(board.ready_len(), 0);
        board.mark_reused(2);
        assert_eq!(board.ready_len(), 1);
        assert_eq!(board.pop_ready(), Some(2));
        assert_eq!(board.pop_ready(), None);
    }

    #[test]
    fn order_of_flags_does_not_matter() {
        let mut board = TileBoard::new(2);
        board.mark_reused(0);
        board.mark_classified(0);
        board.mark_classified(1);
        board.mark_reused(1);
        assert_eq!(board.pop_ready(), Some(0));
        assert_eq!(board.pop_ready(), Some(1));
    }
}
