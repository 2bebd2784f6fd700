use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forage_life_core::config::SimConfig;
use forage_life_core::rng::derive_seed;
use forage_life_core::world::{run_seed_sweep, World};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const WARMUP_STEPS: usize = 60;
const BENCHMARK_STEPS: usize = 600;

#[derive(Parser)]
#[command(name = "forage-life")]
#[command(about = "Forage Life Simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print its summary as JSON
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of simulation ticks to run
        #[arg(long, default_value_t = 3600)]
        steps: usize,

        /// Sample metrics every N ticks
        #[arg(long, default_value_t = 60)]
        sample_every: usize,

        /// Explicit seeds to sweep in parallel (comma separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "runs")]
        seeds: Vec<u64>,

        /// Number of runs with seeds derived from the config seed
        #[arg(long)]
        runs: Option<usize>,

        /// Write the summary here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the final world snapshot (single run only)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Time the tick phases on the default world
    Benchmark {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file = File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    let config: SimConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("config validation error")?;
    Ok(config)
}

fn write_json<T: serde::Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(file, value).context("failed to write json")?;
            tracing::info!(path = %path.display(), "results written");
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn sweep_seeds(config: &SimConfig, seeds: Vec<u64>, runs: Option<usize>) -> Vec<u64> {
    match runs {
        Some(runs) => (0..runs).map(|run| derive_seed(config.seed, run)).collect(),
        None => seeds,
    }
}

fn run_benchmark(config: SimConfig) -> Result<()> {
    let mut world = World::try_new(config).context("failed to initialize world")?;
    for _ in 0..WARMUP_STEPS {
        world.step();
    }

    let mut total_agents_us = 0u64;
    let mut total_overlap_us = 0u64;
    let mut total_food_us = 0u64;
    let mut total_us = 0u64;
    for _ in 0..BENCHMARK_STEPS {
        let timings = world.step();
        total_agents_us += timings.agent_update_us;
        total_overlap_us += timings.overlap_us;
        total_food_us += timings.food_us;
        total_us += timings.total_us;
    }

    let avg_step_us = total_us as f64 / BENCHMARK_STEPS as f64;
    let steps_per_sec = 1_000_000.0 / avg_step_us.max(1.0);
    println!("--- {} agents after warmup ---", world.agent_count());
    println!("  Avg step:      {avg_step_us:.0} us ({steps_per_sec:.1} steps/sec)");
    println!(
        "  Breakdown:     agents={:.0} us, overlap={:.0} us, food={:.0} us",
        total_agents_us as f64 / BENCHMARK_STEPS as f64,
        total_overlap_us as f64 / BENCHMARK_STEPS as f64,
        total_food_us as f64 / BENCHMARK_STEPS as f64,
    );
    let stats = world.population_stats();
    println!(
        "  Population:    collectors={}, predators={}, births={}, deaths={}, consumed={}",
        stats.collectors, stats.predators, stats.total_births, stats.total_deaths, stats.total_consumed
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&SimConfig::default())?);
        }
        Commands::Benchmark { config } => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p forage-life-cli --release -- benchmark");
                eprintln!();
            }
            run_benchmark(load_config(config.as_deref())?)?;
        }
        Commands::Run {
            config,
            steps,
            sample_every,
            seeds,
            runs,
            out,
            snapshot,
        } => {
            let sim_config = load_config(config.as_deref())?;
            let seeds = sweep_seeds(&sim_config, seeds, runs);

            if seeds.is_empty() {
                tracing::info!(seed = sim_config.seed, steps, "starting run");
                let mut world = World::try_new(sim_config).context("failed to initialize world")?;
                let summary = world
                    .try_run_experiment(steps, sample_every)
                    .context("invalid experiment parameters")?;
                tracing::info!(
                    collectors = summary.final_collectors,
                    predators = summary.final_predators,
                    "run complete"
                );
                if let Some(path) = snapshot.as_deref() {
                    write_json(Some(path), &world.snapshot())?;
                }
                write_json(out.as_deref(), &summary)?;
            } else {
                if snapshot.is_some() {
                    bail!("--snapshot is only supported for a single run");
                }
                tracing::info!(runs = seeds.len(), steps, "starting seed sweep");
                let summaries = run_seed_sweep(&sim_config, &seeds, steps, sample_every)
                    .context("seed sweep failed")?;
                write_json(out.as_deref(), &summaries)?;
            }
        }
    }
    Ok(())
}
