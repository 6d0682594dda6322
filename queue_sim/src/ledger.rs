use std::collections::BTreeMap;

use serde::Serialize;

/// Signed +1/-1 deltas keyed by clock instant.
///
/// Deltas landing on the same instant are summed. The raw log keeps
/// insertion order; the merged map is kept sorted as entries arrive, so the
/// queue-size timeline never needs a full re-sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueLedger {
    log: Vec<(usize, i64)>,
    merged: BTreeMap<usize, i64>,
}

impl QueueLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, t: usize, delta: i64) {
        self.log.push((t, delta));
        *self.merged.entry(t).or_insert(0) += delta;
    }

    pub fn arrival(&mut self, t: usize) {
        self.record(t, 1);
    }

    pub fn departure(&mut self, t: usize) {
        self.record(t, -1);
    }

    /// Raw entries in the order they were recorded.
    pub fn entries(&self) -> &[(usize, i64)] {
        &self.log
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Arrivals minus departures.
    pub fn balance(&self) -> i64 {
        self.merged.values().sum()
    }

    /// Queue size right after each distinct instant, in clock order.
    pub fn timeline(&self) -> Vec<(usize, i64)> {
        self.merged
            .iter()
            .scan(0, |size, (&t, &delta)| {
                *size += delta;
                Some((t, *size))
            })
            .collect()
    }

    pub fn max_size(&self) -> i64 {
        self.timeline()
            .into_iter()
            .map(|(_, size)| size)
            .max()
            .unwrap_or(0)
            .max(0)
    }

    /// Each size weighted by how long it lasted until the next distinct
    /// instant, over the span from the first to the last instant.
    pub fn time_weighted_average(&self) -> f64 {
        let timeline = self.timeline();
        let (Some(first), Some(last)) = (timeline.first(), timeline.last()) else {
            return 0.0;
        };
        let span = last.0 - first.0;
        if span == 0 {
            return 0.0;
        }
        let area: i64 = timeline
            .windows(2)
            .map(|pair| pair[0].1 * (pair[1].0 - pair[0].0) as i64)
            .sum();
        area as f64 / span as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn collisions_are_summed_not_overwritten() {
        let mut ledger = QueueLedger::new();
        ledger.arrival(5);
        ledger.arrival(5);
        ledger.departure(5);
        assert_eq!(ledger.timeline(), vec![(5, 1)]);
        assert_eq!(ledger.entries().len(), 3);
    }

    #[test]
    fn timeline_is_sorted_regardless_of_insertion_order() {
        let mut ledger = QueueLedger::new();
        ledger.arrival(0);
        ledger.arrival(2);
        ledger.departure(6);
        ledger.departure(3);
        assert_eq!(ledger.timeline(), vec![(0, 1), (2, 2), (3, 1), (6, 0)]);
        assert_eq!(ledger.entries()[2], (6, -1));
        assert_eq!(ledger.max_size(), 2);
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn average_is_weighted_by_duration() {
        let mut ledger = QueueLedger::new();
        ledger.arrival(0); // 1 for 2 minutes
        ledger.arrival(2); // 2 for 1 minute
        ledger.departure(3); // 1 for 3 minutes
        ledger.departure(6);
        assert_relative_eq!(ledger.time_weighted_average(), 7.0 / 6.0);
    }

    #[test]
    fn empty_ledger() {
        let ledger = QueueLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.max_size(), 0);
        assert_eq!(ledger.balance(), 0);
        assert_eq!(ledger.time_weighted_average(), 0.0);
    }
}
