use std::collections::VecDeque;

use log::{debug, warn};
use serde::Serialize;

use crate::config::IdleGranularity;
use crate::idle::IdleAccumulator;
use crate::{Event, Stats};

/// Bounded pool of identical servers with a FIFO wait list.
///
/// A request is granted on the spot when a server is free (lowest index
/// first), otherwise it waits. A release hands the freed server straight to
/// the oldest waiter, at the release instant. Requests cannot be withdrawn.
pub struct ServicePool {
    busy: Vec<Option<usize>>,
    occupancy: usize,
    waiting: VecDeque<(usize, usize)>, // entity ID, request time
    idle: IdleAccumulator,
    stats: PoolStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub current_occupancy: usize,
    pub current_queue_length: usize,
    pub peak_occupancy: usize,
    pub peak_queue_length: usize,
    pub total_requests: usize,
    pub total_granted: usize,
    pub total_released: usize,
    /// Sum of waits of granted requests only
    pub total_wait_time: usize,
    pub idle_time: usize,
    pub idle_intervals: usize,
}

impl PoolStats {
    pub fn is_at_capacity(&self) -> bool {
        self.current_occupancy == self.capacity
    }

    pub fn has_queue(&self) -> bool {
        self.current_queue_length > 0
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.current_occupancy as f64 / self.capacity as f64
    }

    pub fn avg_wait_time(&self) -> Option<f64> {
        if self.total_granted == 0 {
            return None;
        }
        Some(self.total_wait_time as f64 / self.total_granted as f64)
    }
}

impl ServicePool {
    pub fn new(capacity: usize, granularity: IdleGranularity) -> ServicePool {
        ServicePool {
            busy: vec![None; capacity],
            occupancy: 0,
            waiting: VecDeque::new(),
            idle: IdleAccumulator::new(granularity, capacity),
            stats: PoolStats {
                capacity,
                current_occupancy: 0,
                current_queue_length: 0,
                peak_occupancy: 0,
                peak_queue_length: 0,
                total_requests: 0,
                total_granted: 0,
                total_released: 0,
                total_wait_time: 0,
                idle_time: 0,
                idle_intervals: 0,
            },
        }
    }

    fn grant(&mut self, current_t: usize, server: usize, entity_id: usize, requested_t: usize) -> Event {
        self.idle.on_grant(current_t, server, self.occupancy);
        self.busy[server] = Some(entity_id);
        self.occupancy += 1;

        self.stats.total_granted += 1;
        self.stats.total_wait_time += current_t - requested_t;
        self.stats.peak_occupancy = self.stats.peak_occupancy.max(self.occupancy);
        debug!("[{}] Entity {} granted server {}", current_t, entity_id, server);

        Event::Granted { entity_id, server }
    }

    fn request(&mut self, current_t: usize, entity_id: usize) -> des::Response<Event, Stats> {
        self.stats.total_requests += 1;

        match self.busy.iter().position(Option::is_none) {
            Some(server) => {
                let granted = self.grant(current_t, server, entity_id, current_t);
                des::Response::event(current_t, granted)
            }
            None => {
                self.waiting.push_back((entity_id, current_t));
                self.stats.peak_queue_length = self.stats.peak_queue_length.max(self.waiting.len());
                debug!(
                    "[{}] Entity {} waits, {} in line",
                    current_t,
                    entity_id,
                    self.waiting.len()
                );
                des::Response::new()
            }
        }
    }

    fn release(&mut self, current_t: usize, entity_id: usize, server: usize) -> des::Response<Event, Stats> {
        if self.busy.get(server).copied().flatten() != Some(entity_id) {
            warn!(
                "[{}] Entity {} released server {} it does not hold",
                current_t, entity_id, server
            );
            return des::Response::new();
        }

        self.busy[server] = None;
        self.occupancy -= 1;
        self.stats.total_released += 1;
        self.idle.on_release(current_t, server, self.occupancy);

        match self.waiting.pop_front() {
            Some((next_id, requested_t)) => {
                let granted = self.grant(current_t, server, next_id, requested_t);
                des::Response::event(current_t, granted)
            }
            None => des::Response::new(),
        }
    }
}

impl des::Agent<Event, Stats> for ServicePool {
    fn act(&mut self, current_t: usize, data: &Event) -> des::Response<Event, Stats> {
        match data {
            Event::Requested { entity_id } => self.request(current_t, *entity_id),
            Event::Released { entity_id, server } => self.release(current_t, *entity_id, *server),
            _ => des::Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::PoolStats(PoolStats {
            current_occupancy: self.occupancy,
            current_queue_length: self.waiting.len(),
            idle_time: self.idle.total(),
            idle_intervals: self.idle.intervals(),
            ..self.stats.clone()
        })
    }
}
