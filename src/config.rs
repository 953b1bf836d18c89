use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::Table;

/// Which phases the core composes.  `Full` runs classification, global-sort reuse,
/// render and postprocess; `Adaptive` swaps the reuse sorters for adaptive ones and
/// drops postprocess; `ClassifyOnly` stops after the classification phase.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineProfile {
    #[default]
    Full,
    Adaptive,
    ClassifyOnly,
}

impl FromStr for PipelineProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "full" => Ok(Self::Full),
            "adaptive" => Ok(Self::Adaptive),
            "classify_only" => Ok(Self::ClassifyOnly),
            _ => Err(format!(
                "unsupported pipeline profile '{}', expected one of: full, adaptive, classify_only",
                value
            )),
        }
    }
}

pub trait Config: DeserializeOwned {
    const SECTION: &'static str;

    fn from_table(table: &Table) -> Result<Self> {
        let section = table
            .get(Self::SECTION)
            .with_context(|| format!("missing [{}] section in config", Self::SECTION))?;
        section
            .clone()
            .try_into()
            .with_context(|| format!("cannot deserialize [{}] section", Self::SECTION))
    }
}

/// Service law of the DRAM timing model, in memory-domain cycles.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DramTimingConfig {
    pub base_latency: u64,
    pub bytes_per_cycle: u64,
    pub queue_capacity: usize,
}

impl Default for DramTimingConfig {
    fn default() -> Self {
        Self {
            base_latency: 40,
            bytes_per_cycle: 32,
            queue_capacity: 32,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DramConfig {
    /// Memory-domain clock in MHz.
    pub clock: u64,
    /// Cache line size in bytes; also the request granularity of the wrapper.
    pub cache_line: u64,
    #[serde(default)]
    pub timing: DramTimingConfig,
}

impl Config for DramConfig {
    const SECTION: &'static str = "dram";
}

impl Default for DramConfig {
    fn default() -> Self {
        Self {
            clock: 1600,
            cache_line: 64,
            timing: DramTimingConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    1_000_000_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoreConfig {
    /// Compute-domain clock in MHz.
    pub clock: u64,
    #[serde(default)]
    pub profile: PipelineProfile,
    /// Upper bound on synchronizer steps before the run is aborted.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Config for CoreConfig {
    const SECTION: &'static str = "core";
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            clock: 1000,
            profile: PipelineProfile::default(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtherConfig {
    pub trace: PathBuf,
    pub global_sorter: usize,
    pub adaptive_sorter: usize,
    pub global_chunk_size: u64,
    pub adaptive_chunk_size: u64,
    pub sort_granularity: u64,
    pub render_chunk_size: u64,
    pub renderer: usize,
    pub cache_size: u64,
}

impl Config for OtherConfig {
    const SECTION: &'static str = "other";
}

impl Default for OtherConfig {
    fn default() -> Self {
        Self {
            trace: PathBuf::new(),
            global_sorter: 8,
            adaptive_sorter: 8,
            global_chunk_size: 256,
            adaptive_chunk_size: 256,
            sort_granularity: 16,
            render_chunk_size: 256,
            renderer: 4,
            cache_size: 4 * crate::layout::MB,
        }
    }
}

/// All configuration sections, resolved once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PrismConfig {
    pub dram: DramConfig,
    pub core: CoreConfig,
    pub other: OtherConfig,
}

impl PrismConfig {
    pub fn from_table(table: &Table) -> Result<Self> {
        Ok(Self {
            dram: DramConfig::from_table(table)?,
            core: CoreConfig::from_table(table)?,
            other: OtherConfig::from_table(table)?,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: Table = text.parse().context("cannot parse config toml")?;
        Self::from_table(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"
        [dram]
        clock = 1600
        cache_line = 64

        [core]
        clock = 1000
        profile = "adaptive"

        [other]
        trace = "scene.trace"
        global_sorter = 8
        adaptive_sorter = 8
        global_chunk_size = 256
        adaptive_chunk_size = 256
        sort_granularity = 16
        render_chunk_size = 256
        renderer = 4
        cache_size = 1048576
    "#;

    #[test]
    fn parses_all_sections() {
        let config = PrismConfig::from_toml_str(GOOD).unwrap();
        assert_eq!(config.dram.clock, 1600);
        assert_eq!(config.core.profile, PipelineProfile::Adaptive);
        assert_eq!(config.other.sort_granularity, 16);
        // defaults for keys the file does not carry
        assert_eq!(config.core.timeout, 1_000_000_000);
        assert_eq!(config.dram.timing.base_latency, 40);
    }

    #[test]
    fn missing_section_is_fatal() {
        let table: Table = "[dram]\nclock = 1600\ncache_line = 64".parse().unwrap();
        assert!(CoreConfig::from_table(&table).is_err());
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let text = GOOD.replace("cache_line = 64", "");
        assert!(PrismConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn profile_from_str() {
        assert_eq!("full".parse::<PipelineProfile>().unwrap(), PipelineProfile::Full);
        assert!("render_only".parse::<PipelineProfile>().is_err());
    }
}
