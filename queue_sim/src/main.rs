use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::info;

use queue_sim::report::{render_day_table, render_run_summary, write_outputs};
use queue_sim::{RunDriver, ScenarioConfig, SimError, replicate};

#[derive(Parser)]
#[command(name = "queue_sim", about = "Discrete-event simulation of service counters")]
struct Cli {
    #[command(subcommand)]
    scenario: Scenario,

    /// Seed for the interarrival and service streams
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Clock cutoff in minutes, overriding the scenario's own
    #[arg(long, global = true)]
    horizon: Option<usize>,

    /// Directory for summary.json and per-day event CSVs
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Independent replications, each seeded seed+i
    #[arg(long, global = true, default_value_t = 1)]
    replications: usize,

    /// Worker threads for replications
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Scenario {
    /// Single teller bank counter
    Bank {
        /// Total customers to simulate
        #[arg(short = 'c', long = "customers", default_value_t = 100)]
        customers: usize,

        /// Sample from the historical tables instead of the distributions
        #[arg(short, long)]
        table: bool,
    },
    /// Library service desk over several days
    Library {
        /// Number of days to simulate
        #[arg(short, long, default_value_t = 100)]
        days: usize,

        /// Number of counters in the library
        #[arg(short = 'n', long, default_value_t = 2)]
        counters: usize,
    },
    /// Scenario read from a TOML file
    Config { path: PathBuf },
}

fn build_config(cli: &Cli) -> Result<ScenarioConfig, SimError> {
    let mut config = match &cli.scenario {
        Scenario::Bank { customers, table } => {
            let config = ScenarioConfig::bank(*customers);
            if *table { config.with_table_mode() } else { config }
        }
        Scenario::Library { days, counters } => ScenarioConfig::library(*days, *counters),
        Scenario::Config { path } => ScenarioConfig::from_toml_file(path)?,
    };
    if let Some(seed) = cli.seed {
        config.random_seed = seed;
    }
    if cli.horizon.is_some() {
        config.run_horizon = cli.horizon;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), SimError> {
    let config = build_config(&cli)?;
    info!(
        "{}: {} server(s), {} run(s), horizon {} min, seed {}",
        config.name,
        config.server_count,
        config.day_count,
        config.horizon()?,
        config.random_seed
    );

    if cli.replications > 1 {
        let results = replicate(&config, cli.replications, cli.threads)?;
        println!("{} replications of {}:", results.len(), config.name);
        for (i, result) in results.iter().enumerate() {
            match result {
                Ok(summary) => println!(
                    "  seed {:>4}: max queue {:>3}, avg queue {:>7.3}, idle {:>6} min",
                    config.random_seed.wrapping_add(i as u64),
                    summary.max_queue_size,
                    summary.mean_avg_queue_size,
                    summary.total_idle_time
                ),
                Err(e) => println!("  replication {} failed: {}", i, e),
            }
        }
        return Ok(());
    }

    let mut driver = RunDriver::new(config)?;
    let report = driver.run_days();

    match report.runs.as_slice() {
        [single] => print!("{}", render_run_summary(single)),
        _ => {
            println!("Daily data:");
            print!("{}", render_day_table(&report.summary));
        }
    }

    if let Some(dir) = &cli.output {
        write_outputs(dir, &report)?;
        info!("wrote results to {}", dir.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
