use des::EventLoop;
use des::parallel::ParallelRunner;
use log::{info, warn};
use serde::Serialize;

use crate::arrivals::ArrivalProcess;
use crate::collector::TransitionCollector;
use crate::config::ScenarioConfig;
use crate::error::SimError;
use crate::generator::{RandomGenerator, SharedSource, shared};
use crate::pool::ServicePool;
use crate::statistics::{CrossRunSummary, RunStatistics};
use crate::{Event, Stats};

/// Every run of a multi-day scenario plus the cross-run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiRunReport {
    pub runs: Vec<RunStatistics>,
    pub summary: CrossRunSummary,
}

/// Builds a fresh event loop per run. The duration source is created once
/// and carried from run to run, so day N+1 continues day N's random stream.
pub struct RunDriver {
    config: ScenarioConfig,
    horizon: usize,
    source: SharedSource,
}

impl RunDriver {
    pub fn new(config: ScenarioConfig) -> Result<RunDriver, SimError> {
        config.validate()?;
        let generator = RandomGenerator::from_config(&config)?;
        RunDriver::with_source(config, shared(generator))
    }

    /// Same as `new`, but draws durations from `source` instead of a seeded
    /// generator.
    pub fn with_source(config: ScenarioConfig, source: SharedSource) -> Result<RunDriver, SimError> {
        config.validate()?;
        let horizon = config.horizon()?;
        Ok(RunDriver {
            config,
            horizon,
            source,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    fn build_event_loop(&self) -> EventLoop<Event, Stats> {
        let agents: Vec<Box<dyn des::Agent<Event, Stats>>> = vec![
            Box::new(TransitionCollector::new()),
            Box::new(ServicePool::new(
                self.config.server_count,
                self.config.idle_granularity,
            )),
            Box::new(ArrivalProcess::new(
                self.source.clone(),
                self.config.entity_count,
            )),
        ];
        EventLoop::new(vec![(0, Event::Start)], agents)
    }

    /// Runs one period to the horizon with fresh per-run state.
    pub fn run_once(&mut self, run_index: usize) -> RunStatistics {
        let mut event_loop = self.build_event_loop();
        event_loop.run(self.horizon);

        let run = RunStatistics::from_stats(run_index, self.horizon, &event_loop.stats());
        info!(
            "{} run {}: {} admitted, {} completed, max queue {}, idle {} min ({} events)",
            self.config.name,
            run_index + 1,
            run.admitted,
            run.completed,
            run.max_queue_size,
            run.idle_time,
            event_loop.dispatched()
        );
        if run.truncated > 0 {
            warn!(
                "{} run {}: {} entities still in the system at t={}, excluded from means",
                self.config.name,
                run_index + 1,
                run.truncated,
                self.horizon
            );
        }
        run
    }

    /// Runs `day_count` periods back to back.
    pub fn run_days(&mut self) -> MultiRunReport {
        let runs: Vec<RunStatistics> = (0..self.config.day_count)
            .map(|day| self.run_once(day))
            .collect();
        let summary = CrossRunSummary::from_days(runs.iter().map(|r| r.day_report()).collect());
        MultiRunReport { runs, summary }
    }
}

/// Runs `replications` independent copies of the scenario in parallel, copy
/// `i` seeded with `random_seed + i`. Failed replications are reported in
/// place.
pub fn replicate(
    config: &ScenarioConfig,
    replications: usize,
    threads: Option<usize>,
) -> Result<Vec<Result<CrossRunSummary, String>>, SimError> {
    config.validate()?;

    let mut runner = ParallelRunner::new(replications, |replication| {
        let mut config = config.clone();
        config.random_seed = config.random_seed.wrapping_add(replication as u64);
        RunDriver::new(config).map(|mut driver| driver.run_days().summary)
    });
    if let Some(n) = threads {
        runner = runner.num_threads(n);
    }

    Ok(runner
        .run()
        .into_iter()
        .map(|result| result.and_then(|summary| summary.map_err(|e| e.to_string())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::FixedGenerator;

    #[test]
    fn derived_horizon_for_bank() {
        let driver = RunDriver::new(ScenarioConfig::bank(10)).unwrap();
        assert_eq!(driver.horizon(), 80);
    }

    #[test]
    fn invalid_config_never_runs() {
        let mut config = ScenarioConfig::bank(10);
        config.server_count = 0;
        assert!(RunDriver::new(config).is_err());
    }

    #[test]
    fn fixed_source_single_server() {
        let mut driver =
            RunDriver::with_source(ScenarioConfig::bank(3), shared(FixedGenerator::new(5, 3))).unwrap();
        let run = driver.run_once(0);
        assert_eq!(run.completed, 3);
        assert_eq!(run.wait_times, vec![0, 0, 0]);
        assert_eq!(run.finish_times, vec![3, 8, 13]);
        assert_eq!(run.interarrival_times, vec![vec![5, 5]]);
    }

    #[test]
    fn replications_are_seeded_independently() {
        let config = ScenarioConfig::library(2, 2);
        let results = replicate(&config, 3, Some(2)).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));

        let again = replicate(&config, 3, None).unwrap();
        assert_eq!(results, again);
    }
}
