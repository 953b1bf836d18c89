//! Compute-domain top level: composes the phase controllers according to the pipeline
//! profile and counts compute cycles for the final throughput report.

pub mod common_phase;
pub mod morton;
pub mod postprocess;
pub mod render_phase;
pub mod renderer;
pub mod reuse_phase;
pub mod sorter;

#[cfg(test)]
mod unit_tests;

use log::info;

use crate::config::{PipelineProfile, PrismConfig};
use crate::context::SimContext;
use crate::trace::Trace;
use common_phase::CommonPhase;
use postprocess::PostprocessPhase;
use render_phase::RenderPhase;
use reuse_phase::ReusePhase;
use sorter::{AdaptiveSorter, GlobalSorter, SortEngine, SortTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Parallel,
    Postprocessing,
}

pub struct Core {
    cycle: u64,
    armed: bool,
    state: State,

    common: CommonPhase,
    reuse: Option<ReusePhase>,
    render: Option<RenderPhase>,
    postprocess: Option<PostprocessPhase>,
}

impl Core {
    pub fn new(config: &PrismConfig, trace: &Trace) -> Self {
        let other = &config.other;
        let common = CommonPhase::new(other.global_sorter, trace.num_tiles);

        let (reuse, render, postprocess) = match config.core.profile {
            PipelineProfile::ClassifyOnly => (None, None, None),
            PipelineProfile::Full => {
                let pool: Vec<Box<dyn SortEngine>> = (0..other.adaptive_sorter)
                    .map(|_| Box::new(GlobalSorter::new(SortTarget::Reuse)) as Box<dyn SortEngine>)
                    .collect();
                (
                    Some(ReusePhase::new(pool)),
                    Some(RenderPhase::new(other.renderer)),
                    Some(PostprocessPhase::new()),
                )
            }
            PipelineProfile::Adaptive => {
                let pool: Vec<Box<dyn SortEngine>> = (0..other.adaptive_sorter)
                    .map(|_| Box::new(AdaptiveSorter::new()) as Box<dyn SortEngine>)
                    .collect();
                (
                    Some(ReusePhase::new(pool)),
                    Some(RenderPhase::new(other.renderer)),
                    None,
                )
            }
        };

        Self {
            cycle: 0,
            armed: false,
            state: State::Idle,
            common,
            reuse,
            render,
            postprocess,
        }
    }

    pub fn ready(&mut self) {
        self.armed = true;
    }

    pub fn is_finished(&self) -> bool {
        !self.armed && self.state == State::Idle
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn tick(&mut self, ctx: &mut SimContext) {
        self.cycle += 1;

        self.common.tick(ctx);
        if let Some(reuse) = &mut self.reuse {
            reuse.tick(ctx);
        }
        if let Some(render) = &mut self.render {
            render.tick(ctx);
        }
        if let Some(postprocess) = &mut self.postprocess {
            postprocess.tick(ctx);
        }

        match self.state {
            State::Idle => self.tick_idle(),
            State::Parallel => self.tick_parallel(),
            State::Postprocessing => self.tick_postprocessing(),
        }
    }

    fn tick_idle(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.state = State::Parallel;

        self.common.ready();
        if let Some(reuse) = &mut self.reuse {
            reuse.ready();
        }
        if let Some(render) = &mut self.render {
            render.ready();
        }
    }

    fn tick_parallel(&mut self) {
        let parallel_done = self.common.is_finished()
            && self.reuse.as_ref().map_or(true, |p| p.is_finished())
            && self.render.as_ref().map_or(true, |p| p.is_finished());
        if !parallel_done {
            return;
        }

        match &mut self.postprocess {
            Some(postprocess) => {
                postprocess.ready();
                self.state = State::Postprocessing;
            }
            None => {
                info!("Core Finish ({} cycles)", self.cycle);
                self.state = State::Idle;
            }
        }
    }

    fn tick_postprocessing(&mut self) {
        let done = self
            .postprocess
            .as_ref()
            .map_or(true, |p| p.is_finished());
        if done {
            info!("Core Finish ({} cycles)", self.cycle);
            self.state = State::Idle;
        }
    }
}
