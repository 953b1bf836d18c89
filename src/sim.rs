//! Top-level simulation: owns the clock-domain synchronizer, the core and the shared
//! context, and runs the arm-once/advance-until-finished driver loop.

use anyhow::{bail, Result};
use log::info;
use serde::Serialize;

use crate::config::PrismConfig;
use crate::context::SimContext;
use crate::core::Core;
use crate::layout::{GB, MHZ};
use crate::sync::ClockSync;
use crate::trace::Trace;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub core_cycles: u64,
    pub core_time_ms: f64,
    pub fps: f64,
    pub dram_cycles: u64,
    pub dram_time_ms: f64,
    pub cache_traffic_bytes: u64,
    pub dram_traffic_bytes: u64,
    pub dram_bandwidth_gbps: f64,
}

pub struct Sim {
    sync: ClockSync,
    core: Core,
    ctx: SimContext,
    timeout: u64,
}

impl Sim {
    /// Builds the simulation from a resolved configuration; the trace is loaded from
    /// the path the configuration names.
    pub fn new(config: PrismConfig) -> Result<Self> {
        let trace = Trace::load(&config.other.trace)?;
        Ok(Self::with_trace(config, trace))
    }

    pub fn with_trace(config: PrismConfig, trace: Trace) -> Self {
        let sync = ClockSync::new(config.dram.clock, config.core.clock);
        let core = Core::new(&config, &trace);
        let timeout = config.core.timeout;
        let ctx = SimContext::new(config, trace);
        Self {
            sync,
            core,
            ctx,
            timeout,
        }
    }

    /// Arms the core once and advances the synchronizer until the core reports
    /// finished.  The start request is consumed on the first compute-domain edge, so
    /// the core never observes a partial memory tick.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut start_pending = true;

        for _ in 0..self.timeout {
            let edges = self.sync.advance();

            if edges.mem {
                self.ctx.mem.tick();
            }

            if edges.core {
                if start_pending {
                    start_pending = false;
                    self.core.ready();
                }
                self.core.tick(&mut self.ctx);
            }

            if !start_pending && self.core.is_finished() {
                return Ok(self.summarize());
            }
        }

        bail!("simulation did not finish within {} steps", self.timeout);
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    fn summarize(&self) -> RunSummary {
        let core_clock_hz = (self.ctx.config.core.clock * MHZ) as f64;
        let core_time = self.core.cycles() as f64 / core_clock_hz;
        let fps = if core_time > 0.0 { 1.0 / core_time } else { 0.0 };

        let mem = &self.ctx.mem;
        let dram_time = mem.elapsed_seconds();
        let dram_traffic = mem.dram_traffic_bytes();
        let bandwidth = if dram_time > 0.0 {
            dram_traffic as f64 / dram_time / GB as f64
        } else {
            0.0
        };

        info!("Total Simulation Time: {:.1} ms", core_time * 1000.0);
        info!("Expected FPS: {:.1}", fps);
        mem.summary();

        RunSummary {
            core_cycles: self.core.cycles(),
            core_time_ms: core_time * 1000.0,
            fps,
            dram_cycles: mem.cycle(),
            dram_time_ms: dram_time * 1000.0,
            cache_traffic_bytes: mem.cache_traffic_bytes(),
            dram_traffic_bytes: dram_traffic,
            dram_bandwidth_gbps: bandwidth,
        }
    }
}
