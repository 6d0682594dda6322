use serde::Serialize;

use crate::ledger::QueueLedger;
use crate::{Event, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Arrived,
    ServiceStarted,
    Departed,
}

/// One entity state change, as seen on the event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub t: usize,
    pub entity_id: usize,
    pub kind: TransitionKind,
    pub server: Option<usize>,
}

/// Passive observer: turns arrivals and departures into the queue ledger and
/// keeps the ordered transition stream for whoever renders the run.
#[derive(Default)]
pub struct TransitionCollector {
    ledger: QueueLedger,
    transitions: Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectorStats {
    pub ledger: QueueLedger,
    pub transitions: Vec<Transition>,
}

impl TransitionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, t: usize, entity_id: usize, kind: TransitionKind, server: Option<usize>) {
        self.transitions.push(Transition {
            t,
            entity_id,
            kind,
            server,
        });
    }
}

impl des::Agent<Event, Stats> for TransitionCollector {
    fn act(&mut self, current_t: usize, data: &Event) -> des::Response<Event, Stats> {
        match data {
            Event::Requested { entity_id } => {
                self.ledger.arrival(current_t);
                self.push(current_t, *entity_id, TransitionKind::Arrived, None);
            }
            Event::ServiceStarted {
                entity_id, server, ..
            } => {
                self.push(current_t, *entity_id, TransitionKind::ServiceStarted, Some(*server));
            }
            Event::Released { entity_id, server } => {
                self.ledger.departure(current_t);
                self.push(current_t, *entity_id, TransitionKind::Departed, Some(*server));
            }
            _ => {}
        }
        des::Response::new()
    }

    fn stats(&self) -> Stats {
        Stats::CollectorStats(CollectorStats {
            ledger: self.ledger.clone(),
            transitions: self.transitions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use des::Agent;

    #[test]
    fn arrivals_and_departures_feed_the_ledger() {
        let mut collector = TransitionCollector::new();
        collector.act(0, &Event::Requested { entity_id: 0 });
        collector.act(0, &Event::Granted { entity_id: 0, server: 0 });
        collector.act(
            0,
            &Event::ServiceStarted {
                entity_id: 0,
                server: 0,
                wait: 0,
                duration: 3,
            },
        );
        collector.act(3, &Event::Released { entity_id: 0, server: 0 });

        match collector.stats() {
            Stats::CollectorStats(stats) => {
                assert_eq!(stats.ledger.timeline(), vec![(0, 1), (3, 0)]);
                let kinds: Vec<_> = stats.transitions.iter().map(|t| t.kind).collect();
                assert_eq!(
                    kinds,
                    vec![
                        TransitionKind::Arrived,
                        TransitionKind::ServiceStarted,
                        TransitionKind::Departed
                    ]
                );
            }
            other => panic!("Expected CollectorStats, got {:?}", other),
        }
    }
}
