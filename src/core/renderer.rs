//! Per-tile compositing pipeline.
//!
//! Four stages, overlapped one chunk ahead: load a chunk of the tile's sorted order
//! list, gather the projection record of every entry in it, composite (cost is the
//! number of covered sub-tiles in the chunk, not the number of primitives), and write
//! the order chunk back.

use crate::context::SimContext;
use crate::layout::{
    align_address, new_tile_base, CURR_PROJECTION_BASE, NEW_ENTRY_SIZE, PROJECTION_ENTRY_SIZE,
};
use crate::mem::RequestId;

#[derive(Debug, Clone, Copy)]
struct OrderStage {
    request: RequestId,
    len: u64,
    base: u64,
}

#[derive(Debug, Clone, Copy)]
struct FeatureStage {
    request: RequestId,
    len: u64,
    base: u64,
}

#[derive(Debug, Clone, Copy)]
struct RenderStage {
    remaining: u64,
    len: u64,
    base: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Run,
}

pub struct Renderer {
    state: State,
    armed: Option<u64>,
    tile_id: u64,

    order_load: Option<OrderStage>,
    feature_load: Option<FeatureStage>,
    render: Option<RenderStage>,
    order_store: Option<OrderStage>,
    next_base: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            armed: None,
            tile_id: 0,
            order_load: None,
            feature_load: None,
            render: None,
            order_store: None,
            next_base: 0,
        }
    }

    pub fn ready(&mut self, tile_id: u64) {
        debug_assert!(self.is_idle(), "renderer armed while busy");
        self.armed = Some(tile_id);
    }

    pub fn is_idle(&self) -> bool {
        self.armed.is_none() && self.state == State::Idle
    }

    pub fn tick(&mut self, ctx: &mut SimContext) {
        if let Some(render) = self.render.as_mut() {
            render.remaining = render.remaining.saturating_sub(1);
        }

        match self.state {
            State::Idle => self.tick_idle(ctx),
            State::Run => self.tick_run(ctx),
        }
    }

    fn tick_idle(&mut self, ctx: &mut SimContext) {
        let Some(tile_id) = self.armed.take() else {
            return;
        };
        self.tile_id = tile_id;

        let total = ctx.trace.duplicates_per_tile[tile_id as usize].len() as u64;
        if total == 0 {
            return;
        }

        self.state = State::Run;
        let len = ctx.config.other.render_chunk_size.min(total);
        self.order_load = Some(OrderStage {
            request: ctx.mem.continuous_access(
                new_tile_base(tile_id),
                len * NEW_ENTRY_SIZE,
                false,
                "render order (load)",
            ),
            len,
            base: 0,
        });
        self.next_base = len;
        self.feature_load = None;
        self.render = None;
        self.order_store = None;
    }

    fn tick_run(&mut self, ctx: &mut SimContext) {
        let mut all_done = true;
        if let Some(load) = self.order_load {
            if !ctx.mem.is_finished(load.request) {
                all_done = false;
            }
        }
        if let Some(features) = self.feature_load {
            if !ctx.mem.is_finished(features.request) {
                all_done = false;
            }
        }
        if let Some(render) = &self.render {
            if render.remaining > 0 {
                all_done = false;
            }
        }
        if let Some(store) = self.order_store {
            if !ctx.mem.is_finished(store.request) {
                all_done = false;
            }
        }
        if !all_done {
            return;
        }

        if self.order_load.is_none()
            && self.feature_load.is_none()
            && self.render.is_none()
            && self.order_store.is_none()
        {
            self.state = State::Idle;
            return;
        }

        let entries = &ctx.trace.duplicates_per_tile[self.tile_id as usize];
        let total = entries.len() as u64;

        self.order_store = None;

        if let Some(render) = self.render.take() {
            self.order_store = Some(OrderStage {
                request: ctx.mem.continuous_access(
                    new_tile_base(self.tile_id),
                    render.len * NEW_ENTRY_SIZE,
                    true,
                    "render order (store)",
                ),
                len: render.len,
                base: render.base,
            });
        }

        if let Some(features) = self.feature_load.take() {
            // compositing cost is the covered sub-tile area of the chunk
            let covered: u64 = entries[features.base as usize..(features.base + features.len) as usize]
                .iter()
                .map(|e| e.coverage.iter().filter(|&&bit| bit).count() as u64)
                .sum();
            self.render = Some(RenderStage {
                remaining: covered,
                len: features.len,
                base: features.base,
            });
        }

        if let Some(load) = self.order_load.take() {
            let line = ctx.mem.line_size();
            let addresses: Vec<u64> = entries[load.base as usize..(load.base + load.len) as usize]
                .iter()
                .map(|e| {
                    align_address(
                        CURR_PROJECTION_BASE + e.primitive * PROJECTION_ENTRY_SIZE,
                        line,
                    )
                })
                .collect();
            self.feature_load = Some(FeatureStage {
                request: ctx.mem.discrete_access(&addresses, false, "render features (load)"),
                len: load.len,
                base: load.base,
            });
        }

        if self.next_base < total {
            let len = ctx.config.other.render_chunk_size.min(total - self.next_base);
            self.order_load = Some(OrderStage {
                request: ctx.mem.continuous_access(
                    new_tile_base(self.tile_id),
                    len * NEW_ENTRY_SIZE,
                    false,
                    "render order (load)",
                ),
                len,
                base: self.next_base,
            });
            self.next_base += len;
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
