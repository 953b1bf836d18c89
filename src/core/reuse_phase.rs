//! Reuse phase: sorts the previous frame's surviving (reused) order buffers while the
//! classification phase handles the new ones.  The engine flavor depends on the
//! pipeline profile; the controller only sees the `SortEngine` seam.

use log::info;

use crate::context::SimContext;
use crate::core::morton::MortonWalker;
use crate::core::sorter::SortEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Run,
}

pub struct ReusePhase {
    armed: bool,
    state: State,
    sorters: Vec<Box<dyn SortEngine>>,
    walker: MortonWalker,
    assigned: u64,
}

impl ReusePhase {
    pub fn new(sorters: Vec<Box<dyn SortEngine>>) -> Self {
        Self {
            armed: false,
            state: State::Idle,
            sorters,
            walker: MortonWalker::new(),
            assigned: 0,
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
            State::Idle => {
                if self.armed {
                    self.armed = false;
                    self.state = State::Run;
                    self.assign_tiles(ctx);
                }
            }
            State::Run => {
                self.assign_tiles(ctx);

                let all_assigned = self.assigned >= ctx.trace.num_tiles;
                if all_assigned && self.sorters.iter().all(|s| s.is_idle()) {
                    info!("Reuse Phase Finish");
                    ctx.mem.summary();
                    self.state = State::Idle;
                }
            }
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
