use log::{debug, error};
use serde::Serialize;

use crate::generator::SharedSource;
use crate::{Event, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Created,
    Waiting,
    InService,
    Departed,
}

/// One entity's trip through the system. Times are virtual-clock minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub entity_id: usize,
    pub state: EntityState,
    pub arrival_t: usize,
    pub service_start_t: Option<usize>,
    pub service_duration: Option<usize>,
    pub finish_t: Option<usize>,
    pub departure_t: Option<usize>,
    pub server: Option<usize>,
}

impl EntityRecord {
    pub fn wait(&self) -> Option<usize> {
        self.service_start_t.map(|start| start - self.arrival_t)
    }

    pub fn time_in_system(&self) -> Option<usize> {
        self.finish_t.map(|finish| finish - self.arrival_t)
    }

    pub fn is_departed(&self) -> bool {
        self.state == EntityState::Departed
    }

    /// Still queued or being served, i.e. cut off by the horizon if the run
    /// is over.
    pub fn is_in_system(&self) -> bool {
        matches!(self.state, EntityState::Waiting | EntityState::InService)
    }
}

/// Process of a single entity: `Created -> Waiting -> InService -> Departed`.
///
/// Only reacts to events carrying its own ID. The service duration is drawn
/// when the server is granted, not at arrival.
pub struct Customer {
    record: EntityRecord,
    source: SharedSource,
}

impl Customer {
    pub fn new(entity_id: usize, arrival_t: usize, source: SharedSource) -> Customer {
        Customer {
            record: EntityRecord {
                entity_id,
                state: EntityState::Created,
                arrival_t,
                service_start_t: None,
                service_duration: None,
                finish_t: None,
                departure_t: None,
                server: None,
            },
            source,
        }
    }

    pub fn record(&self) -> &EntityRecord {
        &self.record
    }

    fn start_service(&mut self, current_t: usize, server: usize) -> des::Response<Event, Stats> {
        let entity_id = self.record.entity_id;
        let duration = self.source.borrow_mut().next_service(current_t).max(1);
        let wait = current_t - self.record.arrival_t;
        let finish_t = current_t + duration;

        self.record.state = EntityState::InService;
        self.record.service_start_t = Some(current_t);
        self.record.service_duration = Some(duration);
        self.record.finish_t = Some(finish_t);
        self.record.server = Some(server);
        debug!(
            "[{}] Entity {} (arrived {}) in service at server {} for {}",
            current_t, entity_id, self.record.arrival_t, server, duration
        );

        des::Response::events(vec![
            (
                current_t,
                Event::ServiceStarted {
                    entity_id,
                    server,
                    wait,
                    duration,
                },
            ),
            (finish_t, Event::Released { entity_id, server }),
        ])
    }

    fn depart(&mut self, current_t: usize) {
        debug_assert_eq!(self.record.finish_t, Some(current_t));
        if self.record.finish_t != Some(current_t) {
            error!(
                "[{}] Entity {} departed but was due at {:?}",
                current_t, self.record.entity_id, self.record.finish_t
            );
        }
        self.record.state = EntityState::Departed;
        self.record.departure_t = Some(current_t);
        debug!("[{}] Entity {} departed", current_t, self.record.entity_id);
    }
}

impl des::Agent<Event, Stats> for Customer {
    fn act(&mut self, current_t: usize, data: &Event) -> des::Response<Event, Stats> {
        match (data, self.record.state) {
            (Event::Requested { entity_id }, EntityState::Created) if *entity_id == self.record.entity_id => {
                self.record.state = EntityState::Waiting;
                des::Response::new()
            }
            (Event::Granted { entity_id, server }, EntityState::Waiting)
                if *entity_id == self.record.entity_id =>
            {
                self.start_service(current_t, *server)
            }
            (Event::Released { entity_id, .. }, EntityState::InService)
                if *entity_id == self.record.entity_id =>
            {
                self.depart(current_t);
                des::Response::new()
            }
            _ => des::Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::EntityStats(self.record.clone())
    }
}
