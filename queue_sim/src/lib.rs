//! Discrete-event model of a service counter: entities arrive, queue FIFO
//! for a bounded pool of identical servers, get served and leave.
//!
//! Every moving part is a `des::Agent` reacting to broadcast [`Event`]s:
//!
//! - [`ArrivalProcess`] spawns one [`Customer`] per arrival and schedules the next
//! - [`ServicePool`] grants servers and keeps the FIFO wait list
//! - [`Customer`] draws its service time once granted and schedules its release
//! - [`TransitionCollector`] keeps the queue ledger and the transition stream
//!
//! [`RunDriver`] wires them into an `EventLoop`, runs to the horizon and folds
//! the agents' [`Stats`] into a [`RunStatistics`].

pub mod arrivals;
pub mod collector;
pub mod config;
pub mod customer;
pub mod driver;
pub mod error;
pub mod generator;
pub mod idle;
pub mod ledger;
pub mod pool;
pub mod report;
pub mod statistics;

pub use arrivals::{ArrivalProcess, ArrivalStats};
pub use collector::{CollectorStats, Transition, TransitionCollector, TransitionKind};
pub use config::{ArrivalModel, EmpiricalTable, IdleGranularity, ScenarioConfig, ServiceModel, TableMode};
pub use customer::{Customer, EntityRecord, EntityState};
pub use driver::{MultiRunReport, RunDriver, replicate};
pub use error::SimError;
pub use generator::{DurationSource, FixedGenerator, RandomGenerator, SharedSource, shared};
pub use idle::IdleAccumulator;
pub use ledger::QueueLedger;
pub use pool::{PoolStats, ServicePool};
pub use statistics::{CrossRunSummary, DayReport, RunStatistics};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Kicks off the arrival process at t=0
    Start,
    /// The arrival process's interarrival timeout elapsed
    ArrivalDue,
    /// A new entity asks the pool for a server
    Requested { entity_id: usize },
    /// The pool handed `server` to the entity
    Granted { entity_id: usize, server: usize },
    /// The entity drew its service duration; purely informational
    ServiceStarted {
        entity_id: usize,
        server: usize,
        wait: usize,
        duration: usize,
    },
    /// Service finished: the entity departs and `server` is freed
    Released { entity_id: usize, server: usize },
}

#[derive(Debug, Clone)]
pub enum Stats {
    ArrivalStats(ArrivalStats),
    PoolStats(PoolStats),
    EntityStats(EntityRecord),
    CollectorStats(CollectorStats),
}
