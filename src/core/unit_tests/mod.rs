#[cfg(test)]
mod end_to_end_tests;
#[cfg(test)]
mod sorter_tests;

use crate::config::{
    CoreConfig, DramConfig, DramTimingConfig, OtherConfig, PipelineProfile, PrismConfig,
};
use crate::context::SimContext;
use crate::trace::Trace;

/// Fast DRAM and small chunks so scenarios converge in a few hundred ticks.
pub(crate) fn test_config(profile: PipelineProfile) -> PrismConfig {
    PrismConfig {
        dram: DramConfig {
            clock: 1000,
            cache_line: 64,
            timing: DramTimingConfig {
                base_latency: 1,
                bytes_per_cycle: 64,
                queue_capacity: 64,
            },
        },
        core: CoreConfig {
            clock: 1000,
            profile,
            timeout: 5_000_000,
        },
        other: OtherConfig {
            global_sorter: 2,
            adaptive_sorter: 2,
            global_chunk_size: 2,
            adaptive_chunk_size: 2,
            sort_granularity: 16,
            render_chunk_size: 2,
            renderer: 2,
            cache_size: 0,
            ..OtherConfig::default()
        },
    }
}

pub(crate) fn single_tile_trace(new_count: u64, reused_count: u64) -> Trace {
    Trace {
        width: 16,
        height: 16,
        tile_size: 16,
        sub_tile_size: 8,
        chunk_size: 256,
        num_primitives: 0,
        num_tiles: 1,
        new_count_per_tile: vec![new_count],
        reused_count_per_tile: vec![reused_count],
        duplicates_per_tile: vec![vec![]],
        ..Trace::default()
    }
}

pub(crate) fn single_tile_context(
    profile: PipelineProfile,
    new_count: u64,
    reused_count: u64,
) -> SimContext {
    SimContext::new(test_config(profile), single_tile_trace(new_count, reused_count))
}
