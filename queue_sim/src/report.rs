//! Text and file output for finished runs. Nothing in here feeds back into
//! the simulation.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::collector::TransitionKind;
use crate::driver::MultiRunReport;
use crate::error::SimError;
use crate::statistics::{CrossRunSummary, RunStatistics};

/// Hour the simulated day opens at.
pub const OPENING_HOUR: usize = 8;

/// Wall-clock label for minute `t` of a day that opens at 08:00.
pub fn clock_label(t: usize) -> String {
    let (hours, minutes) = (OPENING_HOUR + t / 60, t % 60);
    match hours {
        h if h < 12 => format!("{:02}:{:02} AM", h, minutes),
        12 => format!("{:02}:{:02} PM", hours, minutes),
        h => format!("{:02}:{:02} PM", h % 12, minutes),
    }
}

fn fmt_opt(value: Option<f64>, scale: f64) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v * scale))
}

pub fn render_run_summary(run: &RunStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Average waiting time = {} min", fmt_opt(run.mean_wait(), 1.0));
    let _ = writeln!(
        out,
        "Probability that a customer has to wait in the queue = {}%",
        fmt_opt(run.wait_probability(), 100.0)
    );
    let _ = writeln!(
        out,
        "Fraction of idle time of the server = {}%",
        fmt_opt(run.idle_fraction(), 100.0)
    );
    let _ = writeln!(out, "Average service time = {} min", fmt_opt(run.mean_service(), 1.0));
    let _ = writeln!(
        out,
        "Average time between arrivals = {} min",
        fmt_opt(run.mean_interarrival(), 1.0)
    );
    let _ = writeln!(
        out,
        "Average waiting time of those who wait = {} min",
        fmt_opt(run.mean_wait_of_waiters(), 1.0)
    );
    let _ = writeln!(
        out,
        "Average time a customer spends in the system = {} min",
        fmt_opt(run.mean_time_in_system(), 1.0)
    );
    if run.truncated > 0 {
        let _ = writeln!(
            out,
            "{} of {} customers were still in the system at t={} and are excluded",
            run.truncated, run.admitted, run.horizon
        );
    }
    out
}

pub fn render_day_table(summary: &CrossRunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} | {:>15} | {:>15} | {:>24}",
        "Day", "Max. Queue Size", "Avg. Queue Size", "Total Idle Time (in min)"
    );
    let _ = writeln!(out, "{}", "-".repeat(68));
    for day in &summary.days {
        let _ = writeln!(
            out,
            "{:>5} | {:>15} | {:>15.3} | {:>24}",
            day.day, day.max_queue_size, day.avg_queue_size, day.idle_time
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "ACROSS {} DAYS OF SIMULATED DATA:", summary.days.len());
    let _ = writeln!(out, "Maximum queue size = {}", summary.max_queue_size);
    let _ = writeln!(out, "Average queue size = {:.3}", summary.mean_avg_queue_size);
    let _ = writeln!(out, "Total idle time = {} min", summary.total_idle_time);
    if summary.total_truncated > 0 {
        let _ = writeln!(
            out,
            "Entities cut off at closing time = {}",
            summary.total_truncated
        );
    }
    out
}

#[derive(Serialize)]
struct TransitionRow<'a> {
    entity_id: usize,
    event: TransitionKind,
    t: usize,
    clock: &'a str,
    server: Option<usize>,
}

/// One CSV row per entity transition, in the order they happened.
pub fn write_transitions_csv<W: Write>(writer: W, run: &RunStatistics) -> Result<(), SimError> {
    let mut csv = csv::Writer::from_writer(writer);
    for transition in &run.transitions {
        let clock = clock_label(transition.t);
        csv.serialize(TransitionRow {
            entity_id: transition.entity_id,
            event: transition.kind,
            t: transition.t,
            clock: &clock,
            server: transition.server,
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<(), SimError> {
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Writes `summary.json` plus `events_day_<n>.csv` per run into `dir`.
pub fn write_outputs(dir: &Path, report: &MultiRunReport) -> Result<(), SimError> {
    fs::create_dir_all(dir)?;
    write_json(fs::File::create(dir.join("summary.json"))?, report)?;
    for run in &report.runs {
        let path = dir.join(format!("events_day_{}.csv", run.run_index + 1));
        write_transitions_csv(fs::File::create(path)?, run)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::driver::RunDriver;
    use crate::generator::{FixedGenerator, shared};

    #[test]
    fn clock_labels() {
        assert_eq!(clock_label(0), "08:00 AM");
        assert_eq!(clock_label(245), "12:05 PM");
        assert_eq!(clock_label(839), "09:59 PM");
    }

    #[test]
    fn transitions_csv_has_header_and_rows() {
        let mut driver =
            RunDriver::with_source(ScenarioConfig::bank(2), shared(FixedGenerator::new(5, 3))).unwrap();
        let run = driver.run_once(0);

        let mut buffer = Vec::new();
        write_transitions_csv(&mut buffer, &run).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "entity_id,event,t,clock,server");
        assert_eq!(lines[1], "0,arrived,0,08:00 AM,");
        assert_eq!(lines[2], "0,service_started,0,08:00 AM,0");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn summary_mentions_truncation() {
        let mut config = ScenarioConfig::bank(3);
        config.run_horizon = Some(7);
        let mut driver = RunDriver::with_source(config, shared(FixedGenerator::new(5, 3))).unwrap();
        let run = driver.run_once(0);
        assert!(render_run_summary(&run).contains("1 of 2 customers"));
    }
}
