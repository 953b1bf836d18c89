//! Classification (common) phase.
//!
//! Runs the frame-global preprocessing steps strictly in sequence (frustum-cull read,
//! projection gather, projection write-back, duplication fan-out), then drives a pool
//! of global sorters over the freshly duplicated per-tile order buffers in Z-order.

use log::info;

use crate::context::SimContext;
use crate::core::morton::MortonWalker;
use crate::core::sorter::{GlobalSorter, SortEngine, SortTarget};
use crate::layout::{
    align_address, new_tile_base, CURR_PROJECTION_BASE, NEW_ENTRY_SIZE, PROJECTION_ENTRY_SIZE,
    RAW_ATTRIBUTE_BASE, RAW_ATTRIBUTE_SIZE, RAW_POSITION_BASE, RAW_POSITION_SIZE,
};
use crate::mem::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    FrustumCull,
    Projection,
    ProjectionStore,
    Duplication,
    Sort,
}

pub struct CommonPhase {
    armed: bool,
    state: State,
    request: RequestId,

    sorters: Vec<GlobalSorter>,
    walker: MortonWalker,
    assigned: u64,
    duplicate_count: Vec<u64>,
}

impl CommonPhase {
    pub fn new(num_sorters: usize, num_tiles: u64) -> Self {
        Self {
            armed: false,
            state: State::Idle,
            request: 0,
            sorters: (0..num_sorters)
                .map(|_| GlobalSorter::new(SortTarget::New))
                .collect(),
            walker: MortonWalker::new(),
            assigned: 0,
            duplicate_count: vec![0; num_tiles as usize],
        }
    }

    pub fn ready(&mut self) {
        self.armed = true;
    }

    pub fn is_finished(&self) -> bool {
        !self.armed && self.state == State::Idle
    }

    pub fn tick(&mut self, ctx: &mut SimContext) {
        for sorter in &mut self.sorters {
            sorter.tick(ctx);
        }

        match self.state {
            State::Idle => self.tick_idle(ctx),
            State::FrustumCull => self.tick_frustum_cull(ctx),
            State::Projection => self.tick_projection(ctx),
            State::ProjectionStore => self.tick_projection_store(ctx),
            State::Duplication => self.tick_duplication(ctx),
            State::Sort => self.tick_sort(ctx),
        }
    }

    fn tick_idle(&mut self, ctx: &mut SimContext) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.state = State::FrustumCull;

        let num_primitives = ctx.trace.num_primitives;
        self.request = ctx.mem.continuous_access(
            RAW_POSITION_BASE,
            num_primitives * RAW_POSITION_SIZE,
            false,
            "frustum cull (load)",
        );
        info!("Common Phase: Frustum Culling {} primitives", num_primitives);
    }

    fn tick_frustum_cull(&mut self, ctx: &mut SimContext) {
        if !ctx.mem.is_finished(self.request) {
            return;
        }
        info!("Common Phase: Frustum Culling Finish");

        self.state = State::Projection;
        let line = ctx.mem.line_size();
        let lines_per_record = (RAW_ATTRIBUTE_SIZE + line - 1) / line;

        let mut addresses = Vec::new();
        for i in 0..ctx.trace.num_primitives {
            if ctx.trace.is_culled[i as usize] {
                continue;
            }
            let record = align_address(RAW_ATTRIBUTE_BASE + i * RAW_ATTRIBUTE_SIZE, line);
            for j in 0..lines_per_record {
                addresses.push(record + j * line);
            }
        }
        info!("Common Phase: Projection (Load) {} requests", addresses.len());
        self.request = ctx.mem.discrete_access(&addresses, false, "projection (load)");
    }

    fn tick_projection(&mut self, ctx: &mut SimContext) {
        if !ctx.mem.is_finished(self.request) {
            return;
        }
        info!("Common Phase: Projection Finish");

        self.state = State::ProjectionStore;
        let line = ctx.mem.line_size();

        let mut addresses = Vec::new();
        for i in 0..ctx.trace.num_primitives {
            if ctx.trace.is_culled[i as usize] {
                continue;
            }
            addresses.push(align_address(
                CURR_PROJECTION_BASE + i * PROJECTION_ENTRY_SIZE,
                line,
            ));
        }
        info!("Common Phase: Projection (Store) {} requests", addresses.len());
        self.request = ctx.mem.discrete_access(&addresses, true, "projection (store)");
    }

    fn tick_projection_store(&mut self, ctx: &mut SimContext) {
        if !ctx.mem.is_finished(self.request) {
            return;
        }
        info!("Common Phase: Store Finish");

        self.state = State::Duplication;
        let line = ctx.mem.line_size();

        // Every surviving duplicate touches its tile's header twice (read-modify-write
        // of the running count) and writes one order slot at the current tail.
        let mut addresses = Vec::new();
        for i in 0..ctx.trace.num_primitives as usize {
            if ctx.trace.is_culled[i] {
                continue;
            }
            for &tile_id in &ctx.trace.duplicates_per_primitive[i] {
                let header = align_address(new_tile_base(tile_id), line);
                addresses.push(header);
                addresses.push(header);

                let slot = new_tile_base(tile_id)
                    + self.duplicate_count[tile_id as usize] * NEW_ENTRY_SIZE;
                addresses.push(align_address(slot, line));

                self.duplicate_count[tile_id as usize] += 1;
            }
        }
        info!("Common Phase: Duplication {} requests", addresses.len());
        self.request = ctx.mem.discrete_access(&addresses, true, "duplication");
    }

    fn tick_duplication(&mut self, ctx: &mut SimContext) {
        if !ctx.mem.is_finished(self.request) {
            return;
        }
        info!("Common Phase: Duplication Finish");

        self.state = State::Sort;
        self.assign_tiles(ctx);
    }

    fn tick_sort(&mut self, ctx: &mut SimContext) {
        self.assign_tiles(ctx);

        let all_assigned = self.assigned >= ctx.trace.num_tiles;
        if all_assigned && self.sorters.iter().all(|s| s.is_idle()) {
            info!("Common Phase: Sort Finish");
            info!("Common Phase Finish");
            ctx.mem.summary();
            self.state = State::Idle;
        }
    }

    fn assign_tiles(&mut self, ctx: &mut SimContext) {
        let num_tiles = ctx.trace.num_tiles;
        let grid_width = ctx.trace.grid_width();
        let grid_height = ctx.trace.grid_height();

        for sorter in &mut self.sorters {
            if self.assigned >= num_tiles {
                break;
            }
            if sorter.is_idle() {
                sorter.ready(self.walker.next_tile(grid_width, grid_height));
                self.assigned += 1;
            }
        }
    }
}
