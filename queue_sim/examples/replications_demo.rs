//! Runs the library scenario under several seeds in parallel and compares
//! the cross-day summaries.
//!
//! Run with:
//!   cargo run --example replications_demo -p queue_sim

use des::parallel::{ParallelRunner, simple_progress_reporter};
use queue_sim::{RunDriver, ScenarioConfig, replicate};

fn main() {
    println!("=== Library desk: 2 vs 3 counters ===\n");

    for counters in [2, 3] {
        let config = ScenarioConfig::library(30, counters);
        let start = std::time::Instant::now();
        let results = match replicate(&config, 16, Some(4)) {
            Ok(results) => results,
            Err(e) => {
                eprintln!("invalid scenario: {}", e);
                return;
            }
        };

        let summaries: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let n = summaries.len().max(1) as f64;
        println!("{} counters, {} replications in {:.2}s", counters, results.len(), start.elapsed().as_secs_f64());
        println!(
            "  mean of daily avg queue size: {:.3}",
            summaries.iter().map(|s| s.mean_avg_queue_size).sum::<f64>() / n
        );
        println!(
            "  mean idle minutes over 30 days: {:.1}",
            summaries.iter().map(|s| s.total_idle_time as f64).sum::<f64>() / n
        );
        println!(
            "  worst queue seen: {}\n",
            summaries.iter().map(|s| s.max_queue_size).max().unwrap_or(0)
        );
    }

    println!("=== Bank counter: wait probability across seeds ===\n");
    let results = ParallelRunner::new(50, |seed| {
        let mut config = ScenarioConfig::bank(100);
        config.random_seed = seed as u64;
        RunDriver::new(config)
            .ok()
            .and_then(|mut driver| driver.run_once(0).wait_probability())
    })
    .progress(simple_progress_reporter(25))
    .run();

    let probabilities: Vec<f64> = results.into_iter().filter_map(|r| r.ok().flatten()).collect();
    if !probabilities.is_empty() {
        let mean = probabilities.iter().sum::<f64>() / probabilities.len() as f64;
        println!("\nP(wait) over {} seeds: {:.1}%", probabilities.len(), mean * 100.0);
    }
}
