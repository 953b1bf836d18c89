//! Render phase: pulls tile ids from the render-ready queue as renderer slots free up.
//! Tiles enter the queue only once both sort paths finish, so the pull order is the
//! completion order of the slower path.

use log::info;

use crate::context::SimContext;
use crate::core::renderer::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Run,
}

pub struct RenderPhase {
    armed: bool,
    state: State,
    renderers: Vec<Renderer>,
    pulled: u64,
}

impl RenderPhase {
    pub fn new(num_renderers: usize) -> Self {
        Self {
            armed: false,
            state: State::Idle,
            renderers: (0..num_renderers).map(|_| Renderer::new()).collect(),
            pulled: 0,
        }
    }

    pub fn ready(&mut self) {
        self.armed = true;
    }

    pub fn is_finished(&self) -> bool {
        !self.armed && self.state == State::Idle
    }

    pub fn tick(&mut self, ctx: &mut SimContext) {
        for renderer in &mut self.renderers {
            renderer.tick(ctx);
        }

        match self.state {
            State::Idle => {
                if self.armed {
                    self.armed = false;
                    self.state = State::Run;
                }
            }
            State::Run => {
                let num_tiles = ctx.trace.num_tiles;

                for renderer in &mut self.renderers {
                    if self.pulled >= num_tiles || ctx.tiles.peek_ready().is_none() {
                        break;
                    }
                    if renderer.is_idle() {
                        let tile_id = ctx.tiles.pop_ready().expect("peek just succeeded");
                        renderer.ready(tile_id);
                        self.pulled += 1;
                    }
                }

                let all_pulled = self.pulled >= num_tiles;
                if all_pulled && self.renderers.iter().all(|r| r.is_idle()) {
                    info!("Render Phase Finish");
                    ctx.mem.summary();
                    self.state = State::Idle;
                }
            }
        }
    }
}
