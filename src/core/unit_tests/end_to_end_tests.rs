use crate::config::PipelineProfile;
use crate::sim::{RunSummary, Sim};
use crate::trace::Trace;

use super::test_config;

// 32x32 frame, 2x2 tile grid, 3 primitives (one culled), per-tile work on three of
// the four tiles.
const SCENE: &str = "\
    32 32 16 8 256 3 4\n\
    0 2 0 1\n\
    0 1 2\n\
    1 0\n\
    4 3 1 0 1 0 1 1\n\
    2 0 1 0 1 1 1 1\n\
    3 2 1 1 0 0 0 1\n\
    0 0 0\n";

fn run_profile(profile: PipelineProfile, scene: &str) -> RunSummary {
    let trace = Trace::parse(scene).unwrap();
    let mut sim = Sim::with_trace(test_config(profile), trace);
    sim.run().unwrap()
}

#[test]
fn full_profile_finishes_and_moves_data() {
    let summary = run_profile(PipelineProfile::Full, SCENE);
    assert!(summary.core_cycles > 0);
    assert!(summary.dram_cycles > 0);
    assert!(summary.dram_traffic_bytes > 0);
    assert!(summary.fps > 0.0);
}

#[test]
fn adaptive_profile_finishes_and_moves_data() {
    let summary = run_profile(PipelineProfile::Adaptive, SCENE);
    assert!(summary.core_cycles > 0);
    assert!(summary.dram_traffic_bytes > 0);
}

#[test]
fn classify_only_is_a_prefix_of_the_full_run() {
    let classify = run_profile(PipelineProfile::ClassifyOnly, SCENE);
    let full = run_profile(PipelineProfile::Full, SCENE);
    assert!(classify.core_cycles > 0);
    assert!(classify.core_cycles <= full.core_cycles);
    assert!(classify.dram_traffic_bytes <= full.dram_traffic_bytes);
}

#[test]
fn empty_scene_completes_without_dram_traffic() {
    // single-tile grid, no primitives, no per-tile work
    let summary = run_profile(PipelineProfile::Full, "16 16 16 8 256 0 1\n0 0 0\n");
    assert!(summary.core_cycles > 0);
    assert_eq!(summary.dram_traffic_bytes, 0);
    assert_eq!(summary.cache_traffic_bytes, 0);
}
