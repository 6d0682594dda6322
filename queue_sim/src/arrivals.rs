use log::debug;
use serde::Serialize;

use crate::customer::Customer;
use crate::generator::SharedSource;
use crate::{Event, Stats};

/// Spawns entities: one `Customer` per arrival, then sleeps for a freshly
/// drawn interarrival gap. Stops after `entity_limit` entities if set.
pub struct ArrivalProcess {
    source: SharedSource,
    entity_limit: Option<usize>,
    next_entity_id: usize,
    interarrivals: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrivalStats {
    pub spawned: usize,
    /// Interarrival samples partitioned by the rate slot they were drawn in
    pub interarrivals: Vec<Vec<usize>>,
}

impl ArrivalProcess {
    pub fn new(source: SharedSource, entity_limit: Option<usize>) -> ArrivalProcess {
        let slots = source.borrow().slot_count().max(1);
        ArrivalProcess {
            source,
            entity_limit,
            next_entity_id: 0,
            interarrivals: vec![Vec::new(); slots],
        }
    }

    fn arrive(&mut self, current_t: usize) -> des::Response<Event, Stats> {
        let entity_id = self.next_entity_id;
        self.next_entity_id += 1;
        debug!("[{}] Entity {} arrived", current_t, entity_id);

        let customer: Box<dyn des::Agent<Event, Stats>> =
            Box::new(Customer::new(entity_id, current_t, self.source.clone()));
        let mut events = vec![(current_t, Event::Requested { entity_id })];

        if self
            .entity_limit
            .is_none_or(|limit| self.next_entity_id < limit)
        {
            let mut source = self.source.borrow_mut();
            let slot = source.slot(current_t).min(self.interarrivals.len() - 1);
            let gap = source.next_interarrival(current_t).max(1);
            self.interarrivals[slot].push(gap);
            events.push((current_t + gap, Event::ArrivalDue));
        }

        des::Response::spawn(customer, events)
    }
}

impl des::Agent<Event, Stats> for ArrivalProcess {
    fn act(&mut self, current_t: usize, data: &Event) -> des::Response<Event, Stats> {
        match data {
            Event::Start | Event::ArrivalDue => self.arrive(current_t),
            _ => des::Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::ArrivalStats(ArrivalStats {
            spawned: self.next_entity_id,
            interarrivals: self.interarrivals.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{FixedGenerator, shared};
    use des::Agent;

    #[test]
    fn each_arrival_spawns_a_customer_and_schedules_the_next() {
        let mut arrivals = ArrivalProcess::new(shared(FixedGenerator::new(5, 3)), None);
        let response = arrivals.act(0, &Event::Start);

        assert_eq!(response.agents.len(), 1);
        assert_eq!(
            response.events,
            vec![(0, Event::Requested { entity_id: 0 }), (5, Event::ArrivalDue)]
        );

        let response = arrivals.act(5, &Event::ArrivalDue);
        assert_eq!(response.events[0], (5, Event::Requested { entity_id: 1 }));
        assert_eq!(response.events[1], (10, Event::ArrivalDue));
    }

    #[test]
    fn limit_stops_drawing_after_last_entity() {
        let mut arrivals = ArrivalProcess::new(shared(FixedGenerator::new(2, 1)), Some(2));
        arrivals.act(0, &Event::Start);
        let response = arrivals.act(2, &Event::ArrivalDue);
        assert_eq!(response.events, vec![(2, Event::Requested { entity_id: 1 })]);

        match arrivals.stats() {
            Stats::ArrivalStats(stats) => {
                assert_eq!(stats.spawned, 2);
                assert_eq!(stats.interarrivals, vec![vec![2]]);
            }
            other => panic!("Expected ArrivalStats, got {:?}", other),
        }
    }
}
