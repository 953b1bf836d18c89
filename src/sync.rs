//! Clock-domain synchronizer.
//!
//! The memory and compute subsystems run at independent clocks.  Both periods are scaled
//! to integer multiples of a common synchronizer tick (`lcm / clock`), and the
//! simulation advances by `gcd(mem_period, core_period)` per step.  Divisibility of the
//! running time selects which domains tick, so the tick ratio is exact over arbitrarily
//! long runs; the running time wraps at `lcm(mem_period, core_period)` to keep the
//! arithmetic bounded.

use num::integer::{gcd, lcm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEdges {
    pub mem: bool,
    pub core: bool,
}

#[derive(Debug)]
pub struct ClockSync {
    mem_period: u64,
    core_period: u64,
    unit: u64,
    wrap: u64,
    current: u64,
}

impl ClockSync {
    /// Clocks are in MHz (any common unit works; only the ratio matters).
    pub fn new(mem_clock: u64, core_clock: u64) -> Self {
        assert!(mem_clock > 0 && core_clock > 0, "clocks must be nonzero");
        let lcm_clock = lcm(mem_clock, core_clock);
        let mem_period = lcm_clock / mem_clock;
        let core_period = lcm_clock / core_clock;
        Self {
            mem_period,
            core_period,
            unit: gcd(mem_period, core_period),
            wrap: lcm(mem_period, core_period),
            current: 0,
        }
    }

    /// Advances one minimal time step and reports which domains tick on it.
    pub fn advance(&mut self) -> TickEdges {
        self.current += self.unit;

        let edges = TickEdges {
            mem: self.current % self.mem_period == 0,
            core: self.current % self.core_period == 0,
        };

        if self.current == self.wrap {
            self.current = 0;
        }

        edges
    }

    pub fn mem_period(&self) -> u64 {
        self.mem_period
    }

    pub fn core_period(&self) -> u64 {
        self.core_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_edges(sync: &mut ClockSync, steps: u64) -> (u64, u64) {
        let mut mem = 0;
        let mut core = 0;
        for _ in 0..steps {
            let edges = sync.advance();
            mem += edges.mem as u64;
            core += edges.core as u64;
        }
        (mem, core)
    }

    #[test]
    fn equal_clocks_tick_together() {
        let mut sync = ClockSync::new(1000, 1000);
        for _ in 0..10 {
            assert_eq!(sync.advance(), TickEdges { mem: true, core: true });
        }
    }

    #[test]
    fn exact_ratio_per_period() {
        // 1600 MHz mem, 1000 MHz core: periods 5 and 8 ticks, lcm 40, unit 1.
        let mut sync = ClockSync::new(1600, 1000);
        assert_eq!(sync.mem_period(), 5);
        assert_eq!(sync.core_period(), 8);

        let steps_per_period = 40;
        let (mem, core) = count_edges(&mut sync, steps_per_period);
        assert_eq!(mem, 8);
        assert_eq!(core, 5);
    }

    #[test]
    fn no_drift_over_many_periods() {
        let mut sync = ClockSync::new(1600, 1000);
        let periods = 1000;
        let (mem, core) = count_edges(&mut sync, 40 * periods);
        assert_eq!(mem, 8 * periods);
        assert_eq!(core, 5 * periods);
    }

    #[test]
    fn coprime_clocks() {
        // periods 7 and 3, unit 1, lcm 21
        let mut sync = ClockSync::new(3, 7);
        assert_eq!(sync.mem_period(), 7);
        assert_eq!(sync.core_period(), 3);
        let (mem, core) = count_edges(&mut sync, 21 * 50);
        assert_eq!(mem, 3 * 50);
        assert_eq!(core, 7 * 50);
    }

    #[test]
    fn integer_multiple_clocks_skip_steps() {
        // mem 4x faster than core: mem ticks every step, core every 4th.
        let mut sync = ClockSync::new(2000, 500);
        let (mem, core) = count_edges(&mut sync, 16);
        assert_eq!(mem, 16);
        assert_eq!(core, 4);
    }
}
