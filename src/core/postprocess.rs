//! Postprocess phase: after rendering, refresh the reuse buffers for the next frame by
//! re-reading every composited entry's projection record and rewriting the reuse order
//! lists in write-combine-sized groups.

use log::info;

use crate::context::SimContext;
use crate::layout::{
    align_address, reuse_tile_base, CURR_PROJECTION_BASE, PROJECTION_ENTRY_SIZE, REUSE_ENTRY_SIZE,
};
use crate::mem::RequestId;

/// Reuse entries per write-back group; one 64-byte burst each.
const WRITE_GROUP: u64 = 64 / REUSE_ENTRY_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Run,
}

pub struct PostprocessPhase {
    armed: bool,
    state: State,
    read_request: RequestId,
    write_request: RequestId,
}

impl PostprocessPhase {
    pub fn new() -> Self {
        Self {
            armed: false,
            state: State::Idle,
            read_request: 0,
            write_request: 0,
        }
    }

    pub fn ready(&mut self) {
        self.armed = true;
    }

    pub fn is_finished(&self) -> bool {
        !self.armed && self.state == State::Idle
    }

    pub fn tick(&mut self, ctx: &mut SimContext) {
        match self.state {
            State::Idle => self.tick_idle(ctx),
            State::Run => self.tick_run(ctx),
        }
    }

    fn tick_idle(&mut self, ctx: &mut SimContext) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.state = State::Run;

        let line = ctx.mem.line_size();
        let mut read_addresses = Vec::new();
        let mut write_addresses = Vec::new();

        for tile_id in 0..ctx.trace.num_tiles {
            let entries = &ctx.trace.duplicates_per_tile[tile_id as usize];

            for entry in entries {
                read_addresses.push(align_address(
                    CURR_PROJECTION_BASE + entry.primitive * PROJECTION_ENTRY_SIZE,
                    line,
                ));
            }

            let mut idx = 0;
            while idx < entries.len() as u64 {
                write_addresses.push(align_address(
                    reuse_tile_base(tile_id) + idx * REUSE_ENTRY_SIZE,
                    line,
                ));
                idx += WRITE_GROUP;
            }
        }

        self.read_request = ctx.mem.discrete_access(&read_addresses, false, "reuse refresh (load)");
        self.write_request = ctx.mem.discrete_access(&write_addresses, true, "reuse refresh (store)");
    }

    fn tick_run(&mut self, ctx: &mut SimContext) {
        if ctx.mem.is_finished(self.read_request) && ctx.mem.is_finished(self.write_request) {
            info!("Postprocess Phase Finish");
            ctx.mem.summary();
            self.state = State::Idle;
        }
    }
}

impl Default for PostprocessPhase {
    fn default() -> Self {
        Self::new()
    }
}
