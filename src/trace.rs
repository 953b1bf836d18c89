//! Workload trace: a per-frame summary of the scene as the trace-producing backend saw
//! it.  Loaded once at startup and never mutated; every phase reads it through the
//! simulation context.

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use smallvec::SmallVec;

/// One duplicated primitive inside a tile's work list.
#[derive(Debug, Clone)]
pub struct TileEntry {
    pub primitive: u64,
    /// One bit per sub-tile of the owning tile; set bits are covered.
    pub coverage: Vec<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub width: u64,
    pub height: u64,
    pub tile_size: u64,
    pub sub_tile_size: u64,
    pub chunk_size: u64,
    pub num_primitives: u64,
    pub num_tiles: u64,

    pub is_culled: Vec<bool>,
    pub duplicates_per_primitive: Vec<SmallVec<[u64; 8]>>,

    pub new_count_per_tile: Vec<u64>,
    pub reused_count_per_tile: Vec<u64>,
    pub duplicates_per_tile: Vec<Vec<TileEntry>>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to open trace file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("malformed trace file {}", path.display()))
    }

    /// Parses the fixed-order whitespace-separated trace format.  Any truncation or
    /// non-numeric token is a fatal error; the simulator never starts on a bad trace.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_ascii_whitespace();
        let mut next = |what: &str| -> Result<u64> {
            let token = tokens
                .next()
                .with_context(|| format!("trace truncated while reading {what}"))?;
            token
                .parse::<u64>()
                .with_context(|| format!("bad token '{token}' while reading {what}"))
        };

        let mut trace = Trace {
            width: next("width")?,
            height: next("height")?,
            tile_size: next("tile_size")?,
            sub_tile_size: next("sub_tile_size")?,
            chunk_size: next("chunk_size")?,
            num_primitives: next("num_primitives")?,
            num_tiles: next("num_tiles")?,
            ..Trace::default()
        };

        ensure!(trace.tile_size > 0, "tile_size must be nonzero");
        ensure!(trace.sub_tile_size > 0, "sub_tile_size must be nonzero");
        ensure!(
            trace.tile_size % trace.sub_tile_size == 0,
            "tile_size {} not divisible by sub_tile_size {}",
            trace.tile_size,
            trace.sub_tile_size
        );

        let coverage_bits = trace.coverage_bits() as usize;

        for i in 0..trace.num_primitives {
            trace.is_culled.push(next("is_culled")? != 0);

            let num_duplicates = next("num_duplicates")?;
            let mut duplicates = SmallVec::new();
            for _ in 0..num_duplicates {
                let tile_id = next("duplicate tile id")?;
                if tile_id >= trace.num_tiles {
                    bail!("primitive {i} duplicates into out-of-range tile {tile_id}");
                }
                duplicates.push(tile_id);
            }
            trace.duplicates_per_primitive.push(duplicates);
        }

        for _ in 0..trace.num_tiles {
            trace.new_count_per_tile.push(next("new_count")?);
            trace.reused_count_per_tile.push(next("reused_count")?);

            let num_entries = next("num_entries")?;
            let mut entries = Vec::with_capacity(num_entries as usize);
            for _ in 0..num_entries {
                let primitive = next("entry primitive id")?;
                if primitive >= trace.num_primitives {
                    bail!("tile entry references out-of-range primitive {primitive}");
                }
                let mut coverage = Vec::with_capacity(coverage_bits);
                for _ in 0..coverage_bits {
                    coverage.push(next("coverage bit")? != 0);
                }
                entries.push(TileEntry { primitive, coverage });
            }
            trace.duplicates_per_tile.push(entries);
        }

        Ok(trace)
    }

    /// Sub-tiles per tile; the number of coverage bits carried by each tile entry.
    pub fn coverage_bits(&self) -> u64 {
        (self.tile_size * self.tile_size) / (self.sub_tile_size * self.sub_tile_size)
    }

    pub fn grid_width(&self) -> u64 {
        (self.width + self.tile_size - 1) / self.tile_size
    }

    pub fn grid_height(&self) -> u64 {
        (self.height + self.tile_size - 1) / self.tile_size
    }
}
