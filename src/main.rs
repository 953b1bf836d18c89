use std::fs;
use std::path::PathBuf;

use clap::Parser;
use toml::Table;

use prism::config::PrismConfig;
use prism::sim::Sim;

#[derive(Parser)]
#[command(version, about)]
struct PrismArgs {
    #[arg(help = "Path to config.toml")]
    config_path: PathBuf,
    #[arg(long, help = "Override trace file path")]
    trace: Option<PathBuf>,
    #[arg(long, help = "Override renderer pool size")]
    renderers: Option<usize>,
    #[arg(long, help = "Override cache size in bytes")]
    cache_size: Option<u64>,
    #[arg(long, help = "Write the run summary as JSON")]
    stats_out: Option<PathBuf>,
}

pub fn main() {
    env_logger::init();

    let argv = PrismArgs::parse();
    let text = fs::read_to_string(&argv.config_path).unwrap_or_else(|err| {
        eprintln!("failed to read config file: {}", err);
        std::process::exit(1);
    });
    let table: Table = text.parse().unwrap_or_else(|err| {
        eprintln!("cannot parse config toml: {}", err);
        std::process::exit(1);
    });

    let mut config = PrismConfig::from_table(&table).unwrap_or_else(|err| {
        eprintln!("bad configuration: {:#}", err);
        std::process::exit(1);
    });

    // override toml configs with argv
    if let Some(trace) = argv.trace {
        config.other.trace = trace;
    }
    config.other.renderer = argv.renderers.unwrap_or(config.other.renderer);
    config.other.cache_size = argv.cache_size.unwrap_or(config.other.cache_size);

    let mut sim = Sim::new(config).unwrap_or_else(|err| {
        eprintln!("failed to initialize simulator: {:#}", err);
        std::process::exit(1);
    });

    let summary = sim.run().unwrap_or_else(|err| {
        eprintln!("simulation failed: {:#}", err);
        std::process::exit(1);
    });

    if let Some(path) = argv.stats_out {
        let json = serde_json::to_string_pretty(&summary).expect("summary serializes");
        if let Err(err) = fs::write(&path, json) {
            eprintln!("failed to write stats to {}: {}", path.display(), err);
            std::process::exit(1);
        }
    }
}
