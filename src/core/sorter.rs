//! Per-tile sort engines.
//!
//! No data is ever reordered; the engines replay the memory traffic and cycle cost of
//! sorting a tile's order buffer.  `GlobalSorter` models an approximate multi-pass
//! bucket sort followed by a chunked, 3-stage pipelined exact sort.  `AdaptiveSorter`
//! is the low-volume variant used on reuse buffers: one in-flight stage at a time,
//! linear cost, no approximation passes.

use crate::context::{SimContext, TileBoard};
use crate::layout::{new_tile_base, reuse_tile_base, NEW_ENTRY_SIZE, REUSE_ENTRY_SIZE};
use crate::mem::RequestId;
use crate::trace::Trace;

/// Which order buffer an engine sorts, and which readiness flag it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortTarget {
    New,
    Reuse,
}

impl SortTarget {
    fn tile_base(self, tile_id: u64) -> u64 {
        match self {
            SortTarget::New => new_tile_base(tile_id),
            SortTarget::Reuse => reuse_tile_base(tile_id),
        }
    }

    fn entry_size(self) -> u64 {
        match self {
            SortTarget::New => NEW_ENTRY_SIZE,
            SortTarget::Reuse => REUSE_ENTRY_SIZE,
        }
    }

    fn pending_count(self, trace: &Trace, tile_id: u64) -> u64 {
        match self {
            SortTarget::New => trace.new_count_per_tile[tile_id as usize],
            SortTarget::Reuse => trace.reused_count_per_tile[tile_id as usize],
        }
    }

    fn mark_done(self, tiles: &mut TileBoard, tile_id: u64) {
        match self {
            SortTarget::New => tiles.mark_classified(tile_id),
            SortTarget::Reuse => tiles.mark_reused(tile_id),
        }
    }
}

fn ceil_log2(value: u64) -> u64 {
    debug_assert!(value >= 2);
    64 - (value - 1).leading_zeros() as u64
}

/// Number of full-buffer read/write passes modeling the approximate sort.  The bucket
/// count is the integer quotient `count / chunk / 8`, exactly as the hardware model
/// sizes its sample buckets.
pub(crate) fn approx_passes(count: u64, chunk: u64) -> u64 {
    let buckets = count / chunk / 8;
    let max_level = if buckets <= 1 { 2 } else { ceil_log2(buckets) + 2 };
    2 * max_level - 1
}

/// Cycles-per-element depth of the exact merge sort over one chunk.  Chunks at or below
/// the sort granularity go through a single hardware pass; the quotient is truncated
/// before the log, matching the modeled merge tree.
pub(crate) fn merge_depth(chunk_len: u64, granularity: u64) -> u64 {
    if chunk_len <= granularity {
        return 1;
    }
    let quotient = chunk_len / granularity;
    if quotient <= 1 {
        0
    } else {
        ceil_log2(quotient)
    }
}

/// Engine interface the phase controllers pool over.
pub trait SortEngine {
    fn tick(&mut self, ctx: &mut SimContext);
    fn ready(&mut self, tile_id: u64);
    fn is_idle(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct ChunkStage {
    request: RequestId,
    len: u64,
    base: u64,
}

#[derive(Debug, Clone, Copy)]
struct SortStage {
    remaining: u64,
    len: u64,
    base: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobalState {
    Idle,
    Approximation,
    Precise,
}

pub struct GlobalSorter {
    target: SortTarget,
    state: GlobalState,
    armed: Option<u64>,
    tile_id: u64,

    approx_request: RequestId,
    approx_remaining: u64,

    load: Option<ChunkStage>,
    sort: Option<SortStage>,
    store: Option<ChunkStage>,
    next_base: u64,
}

impl GlobalSorter {
    pub fn new(target: SortTarget) -> Self {
        Self {
            target,
            state: GlobalState::Idle,
            armed: None,
            tile_id: 0,
            approx_request: 0,
            approx_remaining: 0,
            load: None,
            sort: None,
            store: None,
            next_base: 0,
        }
    }

    fn chunk_size(ctx: &SimContext) -> u64 {
        ctx.config.other.global_chunk_size
    }

    fn tick_idle(&mut self, ctx: &mut SimContext) {
        let Some(tile_id) = self.armed.take() else {
            return;
        };
        self.tile_id = tile_id;

        let count = self.target.pending_count(&ctx.trace, tile_id);
        if count == 0 {
            self.target.mark_done(&mut ctx.tiles, tile_id);
            return;
        }

        self.state = GlobalState::Approximation;
        self.approx_request = ctx.mem.continuous_access(
            self.target.tile_base(tile_id),
            count * self.target.entry_size(),
            false,
            "approximation sort (load)",
        );
        self.approx_remaining = approx_passes(count, Self::chunk_size(ctx));
    }

    fn tick_approximation(&mut self, ctx: &mut SimContext) {
        if !ctx.mem.is_finished(self.approx_request) {
            return;
        }

        let count = self.target.pending_count(&ctx.trace, self.tile_id);
        let base = self.target.tile_base(self.tile_id);
        let entry = self.target.entry_size();

        if self.approx_remaining == 0 {
            // first precise chunk enters the pipeline
            let first_len = Self::chunk_size(ctx).min(count);
            self.state = GlobalState::Precise;
            self.load = Some(ChunkStage {
                request: ctx.mem.continuous_access(base, first_len * entry, false, "precise sort (load)"),
                len: first_len,
                base: 0,
            });
            self.next_base = first_len;
            self.sort = None;
            self.store = None;
        } else {
            // odd remaining count is a store pass, even a load pass
            let is_store = self.approx_remaining % 2 == 1;
            let tag = if is_store {
                "approximation sort (store)"
            } else {
                "approximation sort (load)"
            };
            self.approx_request = ctx.mem.continuous_access(base, count * entry, is_store, tag);
            self.approx_remaining -= 1;
        }
    }

    fn tick_precise(&mut self, ctx: &mut SimContext) {
        let mut all_done = true;
        if let Some(load) = self.load {
            if !ctx.mem.is_finished(load.request) {
                all_done = false;
            }
        }
        if let Some(sort) = &self.sort {
            if sort.remaining > 0 {
                all_done = false;
            }
        }
        if let Some(store) = self.store {
            if !ctx.mem.is_finished(store.request) {
                all_done = false;
            }
        }
        if !all_done {
            return;
        }

        if self.load.is_none() && self.sort.is_none() && self.store.is_none() {
            self.state = GlobalState::Idle;
            self.target.mark_done(&mut ctx.tiles, self.tile_id);
            return;
        }

        let count = self.target.pending_count(&ctx.trace, self.tile_id);
        let base = self.target.tile_base(self.tile_id);
        let entry = self.target.entry_size();

        // advance each stage one chunk, last stage first
        self.store = None;

        if let Some(sort) = self.sort.take() {
            self.store = Some(ChunkStage {
                request: ctx.mem.continuous_access(base, sort.len * entry, true, "precise sort (store)"),
                len: sort.len,
                base: sort.base,
            });
        }

        if let Some(load) = self.load.take() {
            let depth = merge_depth(load.len, ctx.config.other.sort_granularity);
            self.sort = Some(SortStage {
                remaining: depth * load.len,
                len: load.len,
                base: load.base,
            });
        }

        if self.next_base < count {
            let next_base = (self.next_base + Self::chunk_size(ctx)).min(count);
            let len = next_base - self.next_base;
            self.load = Some(ChunkStage {
                request: ctx.mem.continuous_access(base, len * entry, false, "precise sort (load)"),
                len,
                base: self.next_base,
            });
            self.next_base = next_base;
        }
    }
}

impl SortEngine for GlobalSorter {
    fn tick(&mut self, ctx: &mut SimContext) {
        if let Some(sort) = self.sort.as_mut() {
            sort.remaining = sort.remaining.saturating_sub(1);
        }

        match self.state {
            GlobalState::Idle => self.tick_idle(ctx),
            GlobalState::Approximation => self.tick_approximation(ctx),
            GlobalState::Precise => self.tick_precise(ctx),
        }
    }

    fn ready(&mut self, tile_id: u64) {
        debug_assert!(self.is_idle(), "sorter armed while busy");
        self.armed = Some(tile_id);
    }

    fn is_idle(&self) -> bool {
        self.armed.is_none() && self.state == GlobalState::Idle
    }
}

#[derive(Debug, Clone, Copy)]
enum AdaptiveStage {
    Load { request: RequestId, len: u64 },
    Sort { remaining: u64, len: u64 },
    Store { request: RequestId },
}

#[derive(Debug, Clone, Copy)]
enum AdaptiveState {
    Idle,
    Run { stage: AdaptiveStage, next_base: u64 },
}

/// Reuse-buffer sorter with one in-flight operation at a time per tile.  Reuse lists
/// arrive nearly sorted, so the modeled cost is a single linear pass over each chunk.
pub struct AdaptiveSorter {
    armed: Option<u64>,
    tile_id: u64,
    state: AdaptiveState,
}

impl AdaptiveSorter {
    pub fn new() -> Self {
        Self {
            armed: None,
            tile_id: 0,
            state: AdaptiveState::Idle,
        }
    }

    fn issue_load(ctx: &mut SimContext, tile_id: u64, base_idx: u64) -> AdaptiveStage {
        let count = ctx.trace.reused_count_per_tile[tile_id as usize];
        let len = ctx.config.other.adaptive_chunk_size.min(count - base_idx);
        AdaptiveStage::Load {
            request: ctx.mem.continuous_access(
                reuse_tile_base(tile_id) + base_idx * REUSE_ENTRY_SIZE,
                len * REUSE_ENTRY_SIZE,
                false,
                "adaptive sort (load)",
            ),
            len,
        }
    }
}

impl Default for AdaptiveSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl SortEngine for AdaptiveSorter {
    fn tick(&mut self, ctx: &mut SimContext) {
        match &mut self.state {
            AdaptiveState::Idle => {
                let Some(tile_id) = self.armed.take() else {
                    return;
                };
                self.tile_id = tile_id;

                if ctx.trace.reused_count_per_tile[tile_id as usize] == 0 {
                    ctx.tiles.mark_reused(tile_id);
                    return;
                }
                self.state = AdaptiveState::Run {
                    stage: Self::issue_load(ctx, tile_id, 0),
                    next_base: 0,
                };
            }
            AdaptiveState::Run { stage, next_base } => match *stage {
                AdaptiveStage::Load { request, len } => {
                    if ctx.mem.is_finished(request) {
                        *stage = AdaptiveStage::Sort { remaining: len, len };
                    }
                }
                AdaptiveStage::Sort { remaining, len } => {
                    let remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        let request = ctx.mem.continuous_access(
                            reuse_tile_base(self.tile_id) + *next_base * REUSE_ENTRY_SIZE,
                            len * REUSE_ENTRY_SIZE,
                            true,
                            "adaptive sort (store)",
                        );
                        *next_base += len;
                        *stage = AdaptiveStage::Store { request };
                    } else {
                        *stage = AdaptiveStage::Sort { remaining, len };
                    }
                }
                AdaptiveStage::Store { request } => {
                    if ctx.mem.is_finished(request) {
                        let count = ctx.trace.reused_count_per_tile[self.tile_id as usize];
                        if *next_base < count {
                            let base_idx = *next_base;
                            *stage = Self::issue_load(ctx, self.tile_id, base_idx);
                        } else {
                            self.state = AdaptiveState::Idle;
                            ctx.tiles.mark_reused(self.tile_id);
                        }
                    }
                }
            },
        }
    }

    fn ready(&mut self, tile_id: u64) {
        debug_assert!(self.is_idle(), "sorter armed while busy");
        self.armed = Some(tile_id);
    }

    fn is_idle(&self) -> bool {
        self.armed.is_none() && matches!(self.state, AdaptiveState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_passes_small_inputs_take_three_passes() {
        // anything at or below 8 chunks of work collapses to max_level = 2
        assert_eq!(approx_passes(1, 125), 3);
        assert_eq!(approx_passes(1000, 125), 3);
        assert_eq!(approx_passes(125 * 8, 125), 3);
    }

    #[test]
    fn approx_passes_grow_with_bucket_count() {
        // buckets = 2 -> max_level 3 -> 5 passes
        assert_eq!(approx_passes(125 * 16, 125), 5);
        // buckets = 16 -> max_level 6 -> 11 passes
        assert_eq!(approx_passes(125 * 8 * 16, 125), 11);
        // non-power-of-two bucket count rounds the log up
        assert_eq!(approx_passes(125 * 8 * 3, 125), 2 * (2 + 2) - 1);
    }

    #[test]
    fn merge_depth_table() {
        assert_eq!(merge_depth(16, 16), 1);
        assert_eq!(merge_depth(8, 16), 1);
        // truncated quotient of 1 yields a zero-depth pass
        assert_eq!(merge_depth(24, 16), 0);
        assert_eq!(merge_depth(32, 16), 1);
        assert_eq!(merge_depth(64, 16), 2);
        assert_eq!(merge_depth(96, 16), 3);
        assert_eq!(merge_depth(1024, 16), 6);
    }
}
