//! Memory access wrapper.
//!
//! Every engine in the design issues logical accesses here and polls for completion;
//! the wrapper splits them into line-sized requests, short-circuits cache hits, and
//! feeds misses to the DRAM timing model under per-request back-pressure.  Writes are
//! fire-and-forget (complete once every line is sent); reads complete only once every
//! line is acknowledged.

pub mod cache;
pub mod dram;

use std::collections::BTreeMap;

use log::{debug, info};
use serde::Serialize;

use crate::config::DramConfig;
use crate::layout::{align_address, CURR_PROJECTION_BASE, GB, MB, MHZ, REUSE_BASE};
use cache::LruCache;
use dram::{DramCompletion, DramModel};

pub type RequestId = u64;

#[derive(Debug)]
struct PendingRequest {
    is_write: bool,
    total: u64,
    sent: u64,
    acked: u64,
    addresses: Vec<u64>,
    tag: &'static str,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct MemStats {
    /// Lines serviced by the cache without touching DRAM.
    pub cache_lines: u64,
    /// Lines accepted by the DRAM model.
    pub dram_lines: u64,
    pub read_requests: u64,
    pub write_requests: u64,
}

pub struct MemorySubsystem {
    dram: DramModel,
    cache: LruCache,
    pending: BTreeMap<RequestId, PendingRequest>,
    next_id: RequestId,
    cycle: u64,
    line: u64,
    clock_mhz: u64,
    stats: MemStats,
}

impl MemorySubsystem {
    pub fn new(config: &DramConfig, cache_size: u64) -> Self {
        Self {
            dram: DramModel::new(config.timing, config.cache_line),
            cache: LruCache::new(
                cache_size,
                config.cache_line,
                CURR_PROJECTION_BASE,
                REUSE_BASE,
            ),
            pending: BTreeMap::new(),
            next_id: 0,
            cycle: 0,
            line: config.cache_line,
            clock_mhz: config.clock,
            stats: MemStats::default(),
        }
    }

    /// One memory-domain clock edge: retire DRAM completions, then service every
    /// pending request in creation order.  A rejected line stalls only its own request;
    /// later requests still get their turn within the same tick.
    pub fn tick(&mut self) {
        self.cycle += 1;

        let mut completions: Vec<DramCompletion> = Vec::new();
        self.dram.tick(self.cycle, |c| completions.push(c));
        for completion in completions {
            if completion.is_write {
                continue;
            }
            if let Some(request) = self.pending.get_mut(&completion.request) {
                request.acked += 1;
            }
            self.cache.insert(completion.address);
        }

        self.cache.tick();

        for (&id, request) in self.pending.iter_mut() {
            while request.sent < request.total {
                let address = request.addresses[request.sent as usize];

                if self.cache.is_hit(address) {
                    self.stats.cache_lines += 1;
                    request.sent += 1;
                    request.acked += 1;
                    continue;
                }

                if self.dram.try_send(self.cycle, id, address, request.is_write) {
                    self.stats.dram_lines += 1;
                    request.sent += 1;
                } else {
                    break;
                }
            }
        }
    }

    /// Issue `size / line` contiguous line-aligned accesses starting at `base`.
    pub fn continuous_access(
        &mut self,
        base: u64,
        size: u64,
        is_write: bool,
        tag: &'static str,
    ) -> RequestId {
        let total = size / self.line;
        let addresses = (0..total)
            .map(|i| align_address(base + i * self.line, self.line))
            .collect();
        self.create_request(is_write, addresses, tag)
    }

    /// Issue one access per caller-supplied address, each independently line-aligned.
    pub fn discrete_access(
        &mut self,
        addresses: &[u64],
        is_write: bool,
        tag: &'static str,
    ) -> RequestId {
        let aligned = addresses
            .iter()
            .map(|&a| align_address(a, self.line))
            .collect();
        self.create_request(is_write, aligned, tag)
    }

    fn create_request(&mut self, is_write: bool, addresses: Vec<u64>, tag: &'static str) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;

        if is_write {
            self.stats.write_requests += 1;
        } else {
            self.stats.read_requests += 1;
        }
        debug!(
            "mem request {}: {} [{}] {} lines",
            id,
            if is_write { "write" } else { "read" },
            tag,
            addresses.len()
        );

        self.pending.insert(
            id,
            PendingRequest {
                is_write,
                total: addresses.len() as u64,
                sent: 0,
                acked: 0,
                addresses,
                tag,
            },
        );
        id
    }

    /// Idempotent completion poll.  A finished request is reclaimed on the poll that
    /// observes it; unknown (already reclaimed) ids report finished forever after.
    pub fn is_finished(&mut self, id: RequestId) -> bool {
        let Some(request) = self.pending.get(&id) else {
            return true;
        };

        let done = if request.is_write {
            request.sent == request.total
        } else {
            request.acked == request.total
        };
        if done {
            debug!("mem request {} [{}] complete", id, request.tag);
            self.pending.remove(&id);
        }
        done
    }

    pub fn stats(&self) -> &MemStats {
        &self.stats
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn line_size(&self) -> u64 {
        self.line
    }

    pub fn cache_traffic_bytes(&self) -> u64 {
        self.stats.cache_lines * self.line
    }

    pub fn dram_traffic_bytes(&self) -> u64 {
        self.stats.dram_lines * self.line
    }

    /// Seconds of memory-domain time elapsed so far.
    pub fn elapsed_seconds(&self) -> f64 {
        self.cycle as f64 / (self.clock_mhz * MHZ) as f64
    }

    /// Aggregate traffic and bandwidth counters, as log lines.
    pub fn summary(&self) {
        let cache_traffic = self.cache_traffic_bytes() as f64;
        info!("Total Cache Traffic : {:.1} MB", cache_traffic / MB as f64);

        let dram_traffic = self.dram_traffic_bytes() as f64;
        info!("Total DRAM Traffic : {:.1} MB", dram_traffic / MB as f64);

        let total_time = self.elapsed_seconds();
        if total_time > 0.0 {
            info!(
                "Total DRAM Time : {:.1} ms ({:.1} FPS)",
                total_time * 1000.0,
                1.0 / total_time
            );
            info!(
                "Total DRAM Bandwidth : {:.1} GB/s",
                dram_traffic / total_time / GB as f64
            );
        }
    }
}
