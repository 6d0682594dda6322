use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::trace;

pub mod parallel;

/// A pending event: fires at `t`, ties broken by registration order `seq`.
struct Event<T> {
    t: usize,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.t == other.t && self.seq == other.seq
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // BinaryHeap is a max-heap, so both keys are reversed
    fn cmp(&self, other: &Self) -> Ordering {
        other.t.cmp(&self.t).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What an agent hands back to the loop after reacting to an event.
pub struct Response<T, S> {
    pub events: Vec<(usize, T)>,
    pub agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> Response<T, S> {
    pub fn new() -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
        }
    }

    pub fn event(t: usize, data: T) -> Response<T, S> {
        Response {
            events: vec![(t, data)],
            agents: Vec::new(),
        }
    }

    pub fn events(events: Vec<(usize, T)>) -> Response<T, S> {
        Response {
            events,
            agents: Vec::new(),
        }
    }

    pub fn spawn(agent: Box<dyn Agent<T, S>>, events: Vec<(usize, T)>) -> Response<T, S> {
        Response {
            events,
            agents: vec![agent],
        }
    }
}

impl<T, S> Default for Response<T, S> {
    fn default() -> Self {
        Response::new()
    }
}

pub trait Agent<T, S> {
    fn act(&mut self, _current_t: usize, _data: &T) -> Response<T, S> {
        Response::new()
    }

    fn stats(&self) -> S;
}

/// Single-threaded cooperative scheduler.
///
/// Every event is broadcast to every agent in registration order. The clock
/// only moves forward: events an agent schedules in the past are clamped to
/// the current instant. Events sharing an instant fire in the order they were
/// pushed.
pub struct EventLoop<T, S> {
    queue: BinaryHeap<Event<T>>,
    current_t: usize,
    next_seq: u64,
    dispatched: usize,
    agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> EventLoop<T, S> {
    pub fn new(events: Vec<(usize, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut event_loop = EventLoop {
            queue: BinaryHeap::with_capacity(events.len()),
            current_t: 0,
            next_seq: 0,
            dispatched: 0,
            agents,
        };
        for (t, data) in events {
            event_loop.schedule(t, data);
        }
        event_loop
    }

    fn schedule(&mut self, t: usize, data: T) {
        let t = t.max(self.current_t);
        self.queue.push(Event {
            t,
            seq: self.next_seq,
            data,
        });
        self.next_seq += 1;
    }

    fn broadcast(&mut self, event: Event<T>) {
        self.current_t = event.t;
        self.dispatched += 1;
        trace!("t={} dispatching event #{}", event.t, event.seq);

        let mut new_agents = Vec::new();
        let mut new_events = Vec::new();
        for agent in &mut self.agents {
            let response = agent.act(self.current_t, &event.data);
            new_events.extend(response.events);
            new_agents.extend(response.agents);
        }
        for (t, data) in new_events {
            self.schedule(t, data);
        }
        self.agents.extend(new_agents);
    }

    /// Resolves events until none remain or the next one is due at or after
    /// `until`. Events left behind stay pending.
    pub fn run(&mut self, until: usize) {
        while let Some(next) = self.queue.peek() {
            if next.t >= until {
                break;
            }
            if let Some(event) = self.queue.pop() {
                self.broadcast(event);
            }
        }
    }

    pub fn current_t(&self) -> usize {
        self.current_t
    }

    /// Number of events still waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of events resolved so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records (t, payload) of every event it sees.
    struct Recorder {
        seen: Vec<(usize, u8)>,
    }

    impl Agent<u8, Vec<(usize, u8)>> for Recorder {
        fn act(&mut self, current_t: usize, data: &u8) -> Response<u8, Vec<(usize, u8)>> {
            self.seen.push((current_t, *data));
            Response::new()
        }

        fn stats(&self) -> Vec<(usize, u8)> {
            self.seen.clone()
        }
    }

    fn recorder() -> Box<dyn Agent<u8, Vec<(usize, u8)>>> {
        Box::new(Recorder { seen: Vec::new() })
    }

    #[test]
    fn min_queue() {
        let mut queue = BinaryHeap::<Event<u8>>::new();
        queue.push(Event { t: 2, seq: 0, data: 2 });
        queue.push(Event { t: 1, seq: 1, data: 1 });
        assert_eq!(queue.peek().map(|e| e.data), Some(1));
    }

    #[test]
    fn same_instant_events_fire_in_registration_order() {
        let mut event_loop = EventLoop::new(vec![(5, 1), (5, 2), (3, 0), (5, 3)], vec![recorder()]);
        event_loop.run(100);
        assert_eq!(event_loop.stats()[0], vec![(3, 0), (5, 1), (5, 2), (5, 3)]);
    }

    #[test]
    fn run_stops_before_horizon() {
        let mut event_loop = EventLoop::new(vec![(1, 1), (10, 2), (11, 3)], vec![recorder()]);
        event_loop.run(10);
        assert_eq!(event_loop.current_t(), 1);
        assert_eq!(event_loop.pending(), 2);
        assert_eq!(event_loop.dispatched(), 1);
    }

    #[test]
    fn past_events_are_clamped_to_now() {
        struct Backdater;
        impl Agent<u8, ()> for Backdater {
            fn act(&mut self, current_t: usize, data: &u8) -> Response<u8, ()> {
                if *data == 0 {
                    Response::event(current_t.saturating_sub(3), 1)
                } else {
                    Response::new()
                }
            }
            fn stats(&self) {}
        }

        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(Backdater)];
        let mut event_loop = EventLoop::new(vec![(5, 0)], agents);
        event_loop.run(100);
        assert_eq!(event_loop.current_t(), 5);
        assert_eq!(event_loop.dispatched(), 2);
    }

    #[test]
    fn spawned_agents_join_after_current_event() {
        struct Spawner;
        impl Agent<u8, usize> for Spawner {
            fn act(&mut self, _current_t: usize, _data: &u8) -> Response<u8, usize> {
                let child: Box<dyn Agent<u8, usize>> = Box::new(Spawner);
                Response::spawn(child, vec![])
            }
            fn stats(&self) -> usize {
                1
            }
        }

        let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(Spawner)];
        let mut event_loop = EventLoop::new(vec![(1, 1), (2, 2)], agents);
        event_loop.run(100);

        // First event: 1 new agent
        // Second event: 2 new agents
        assert_eq!(event_loop.stats().len(), 4);
    }
}
