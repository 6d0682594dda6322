use serde::Serialize;

use crate::Stats;
use crate::collector::Transition;
use crate::customer::EntityRecord;

/// Snapshot of one finished run.
///
/// The per-entity sequences only cover entities that departed before the
/// horizon. Entities still waiting or in service when the clock stopped are
/// counted in `truncated` and listed in `truncated_entities`, and kept out
/// of every mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub run_index: usize,
    pub horizon: usize,
    pub admitted: usize,
    pub completed: usize,
    pub truncated: usize,
    pub entities: Vec<EntityRecord>,
    pub truncated_entities: Vec<EntityRecord>,
    pub wait_times: Vec<usize>,
    pub service_times: Vec<usize>,
    pub finish_times: Vec<usize>,
    pub time_in_system: Vec<usize>,
    /// Interarrival samples, one vector per rate slot
    pub interarrival_times: Vec<Vec<usize>>,
    pub idle_time: usize,
    pub peak_occupancy: usize,
    pub server_count: usize,
    pub max_queue_size: i64,
    pub avg_queue_size: f64,
    pub ledger_balance: i64,
    pub queue_timeline: Vec<(usize, i64)>,
    pub transitions: Vec<Transition>,
}

fn mean<I: IntoIterator<Item = usize>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0usize, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

impl RunStatistics {
    /// Folds the agents' end-of-run stats into one snapshot.
    pub fn from_stats(run_index: usize, horizon: usize, stats: &[Stats]) -> RunStatistics {
        let mut run = RunStatistics {
            run_index,
            horizon,
            admitted: 0,
            completed: 0,
            truncated: 0,
            entities: Vec::new(),
            truncated_entities: Vec::new(),
            wait_times: Vec::new(),
            service_times: Vec::new(),
            finish_times: Vec::new(),
            time_in_system: Vec::new(),
            interarrival_times: Vec::new(),
            idle_time: 0,
            peak_occupancy: 0,
            server_count: 0,
            max_queue_size: 0,
            avg_queue_size: 0.0,
            ledger_balance: 0,
            queue_timeline: Vec::new(),
            transitions: Vec::new(),
        };

        for stat in stats {
            match stat {
                Stats::EntityStats(record) => {
                    run.admitted += 1;
                    if record.is_departed() {
                        run.entities.push(record.clone());
                    } else if record.is_in_system() {
                        run.truncated_entities.push(record.clone());
                    }
                }
                Stats::ArrivalStats(arrivals) => {
                    run.interarrival_times = arrivals.interarrivals.clone();
                }
                Stats::PoolStats(pool) => {
                    run.idle_time = pool.idle_time;
                    run.peak_occupancy = pool.peak_occupancy;
                    run.server_count = pool.capacity;
                }
                Stats::CollectorStats(collector) => {
                    run.max_queue_size = collector.ledger.max_size();
                    run.avg_queue_size = collector.ledger.time_weighted_average();
                    run.ledger_balance = collector.ledger.balance();
                    run.queue_timeline = collector.ledger.timeline();
                    run.transitions = collector.transitions.clone();
                }
            }
        }

        run.entities.sort_by_key(|e| e.entity_id);
        run.truncated_entities.sort_by_key(|e| e.entity_id);
        run.completed = run.entities.len();
        run.truncated = run.truncated_entities.len();

        for entity in &run.entities {
            if let (Some(wait), Some(duration), Some(finish), Some(spent)) = (
                entity.wait(),
                entity.service_duration,
                entity.finish_t,
                entity.time_in_system(),
            ) {
                run.wait_times.push(wait);
                run.service_times.push(duration);
                run.finish_times.push(finish);
                run.time_in_system.push(spent);
            }
        }

        run
    }

    pub fn mean_wait(&self) -> Option<f64> {
        mean(self.wait_times.iter().copied())
    }

    /// Fraction of completed entities that waited at all.
    pub fn wait_probability(&self) -> Option<f64> {
        if self.wait_times.is_empty() {
            return None;
        }
        let waited = self.wait_times.iter().filter(|w| **w > 0).count();
        Some(waited as f64 / self.wait_times.len() as f64)
    }

    pub fn mean_wait_of_waiters(&self) -> Option<f64> {
        mean(self.wait_times.iter().copied().filter(|w| *w > 0))
    }

    pub fn mean_service(&self) -> Option<f64> {
        mean(self.service_times.iter().copied())
    }

    pub fn mean_interarrival(&self) -> Option<f64> {
        mean(self.interarrival_times.iter().flatten().copied())
    }

    pub fn mean_time_in_system(&self) -> Option<f64> {
        mean(self.time_in_system.iter().copied())
    }

    /// Idle time over the elapsed clock up to the last departure.
    pub fn idle_fraction(&self) -> Option<f64> {
        let elapsed = self.finish_times.iter().copied().max()?;
        if elapsed == 0 {
            return None;
        }
        Some(self.idle_time as f64 / elapsed as f64)
    }

    pub fn day_report(&self) -> DayReport {
        DayReport {
            day: self.run_index + 1,
            max_queue_size: self.max_queue_size,
            avg_queue_size: self.avg_queue_size,
            idle_time: self.idle_time,
            completed: self.completed,
            truncated: self.truncated,
        }
    }
}

/// One row of the cross-run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    pub day: usize,
    pub max_queue_size: i64,
    pub avg_queue_size: f64,
    pub idle_time: usize,
    pub completed: usize,
    pub truncated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossRunSummary {
    pub days: Vec<DayReport>,
    pub max_queue_size: i64,
    pub mean_avg_queue_size: f64,
    pub total_idle_time: usize,
    pub total_truncated: usize,
}

impl CrossRunSummary {
    pub fn from_days(days: Vec<DayReport>) -> CrossRunSummary {
        let max_queue_size = days.iter().map(|d| d.max_queue_size).max().unwrap_or(0);
        let mean_avg_queue_size = if days.is_empty() {
            0.0
        } else {
            days.iter().map(|d| d.avg_queue_size).sum::<f64>() / days.len() as f64
        };
        CrossRunSummary {
            max_queue_size,
            mean_avg_queue_size,
            total_idle_time: days.iter().map(|d| d.idle_time).sum(),
            total_truncated: days.iter().map(|d| d.truncated).sum(),
            days,
        }
    }
}
