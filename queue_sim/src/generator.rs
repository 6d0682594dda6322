use std::cell::RefCell;
use std::rc::Rc;

use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use crate::config::{ArrivalModel, EmpiricalTable, ScenarioConfig, ServiceModel};
use crate::error::SimError;

/// Supplies interarrival gaps and service durations, in whole minutes.
///
/// Implementations must return at least 1 from both methods.
pub trait DurationSource {
    fn next_interarrival(&mut self, now: usize) -> usize;

    fn next_service(&mut self, now: usize) -> usize;

    /// Rate slot the clock is in, for partitioning interarrival samples.
    fn slot(&self, _now: usize) -> usize {
        0
    }

    fn slot_count(&self) -> usize {
        1
    }
}

/// One stream shared by the arrival process and every entity it spawns.
pub type SharedSource = Rc<RefCell<dyn DurationSource>>;

pub fn shared<G: DurationSource + 'static>(generator: G) -> SharedSource {
    Rc::new(RefCell::new(generator))
}

#[derive(Debug, Clone)]
enum ArrivalSampler {
    Uniform {
        min: usize,
        max: usize,
    },
    SlotExponential {
        slot_minutes: usize,
        rates: Vec<Exp<f64>>,
    },
    Table {
        values: Vec<usize>,
        divisor: usize,
        max_units: usize,
    },
}

#[derive(Debug, Clone)]
enum ServiceSampler {
    Uniform {
        min: usize,
        max: usize,
    },
    Discrete {
        index: WeightedIndex<f64>,
        durations: Vec<usize>,
    },
    Table {
        values: Vec<usize>,
        thresholds: Vec<f64>,
        durations: Vec<usize>,
    },
}

/// Seeded generator built from a `ScenarioConfig`.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    rng: StdRng,
    arrivals: ArrivalSampler,
    service: ServiceSampler,
}

impl RandomGenerator {
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, SimError> {
        let tables = if config.use_table_mode {
            Some(config.tables.as_ref().ok_or(SimError::EmptyTable {
                name: "interarrival",
            })?)
        } else {
            None
        };

        let arrivals = match tables {
            Some(tables) => {
                let units = config
                    .entity_count
                    .unwrap_or(tables.interarrival.values.len());
                interarrival_table(&tables.interarrival, units)?
            }
            None => match &config.arrivals {
                ArrivalModel::Uniform { min, max } => ArrivalSampler::Uniform {
                    min: *min,
                    max: *max,
                },
                ArrivalModel::SlotExponential {
                    slot_minutes,
                    means,
                } => {
                    let rates = means
                        .iter()
                        .map(|mean| {
                            Exp::new(1.0 / mean)
                                .map_err(|e| SimError::InvalidDistribution(e.to_string()))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    if rates.is_empty() {
                        return Err(SimError::InvalidDistribution(
                            "no interarrival slots".to_string(),
                        ));
                    }
                    ArrivalSampler::SlotExponential {
                        slot_minutes: (*slot_minutes).max(1),
                        rates,
                    }
                }
            },
        };

        let service = match tables {
            Some(tables) => service_table(&tables.service, &config.service)?,
            None => match &config.service {
                ServiceModel::Uniform { min, max } => ServiceSampler::Uniform {
                    min: *min,
                    max: *max,
                },
                ServiceModel::Discrete { .. } => {
                    let (durations, probabilities) = config.service.support();
                    let index = WeightedIndex::new(&probabilities)
                        .map_err(|e| SimError::InvalidDistribution(e.to_string()))?;
                    ServiceSampler::Discrete { index, durations }
                }
            },
        };

        Ok(RandomGenerator {
            rng: StdRng::seed_from_u64(config.random_seed),
            arrivals,
            service,
        })
    }
}

fn interarrival_table(table: &EmpiricalTable, units: usize) -> Result<ArrivalSampler, SimError> {
    if table.values.is_empty() {
        return Err(SimError::EmptyTable {
            name: "interarrival",
        });
    }
    let divisor = (table.value_range / units.max(1)).max(1);
    Ok(ArrivalSampler::Table {
        values: table.values.clone(),
        divisor,
        max_units: (table.value_range / divisor).max(1),
    })
}

fn service_table(table: &EmpiricalTable, model: &ServiceModel) -> Result<ServiceSampler, SimError> {
    if table.values.is_empty() {
        return Err(SimError::EmptyTable { name: "service" });
    }
    let (durations, probabilities) = model.support();
    if durations.is_empty() {
        return Err(SimError::InvalidDistribution(
            "service model has no durations".to_string(),
        ));
    }
    let scale = table.value_range as f64;
    let thresholds = probabilities
        .iter()
        .scan(0.0, |cumulative, p| {
            *cumulative += p;
            Some(*cumulative * scale)
        })
        .collect();
    Ok(ServiceSampler::Table {
        values: table.values.clone(),
        thresholds,
        durations,
    })
}

/// First bucket whose scaled cumulative probability reaches `raw`; a raw
/// value beyond the last threshold lands in the last bucket.
pub fn inverse_cdf_bucket(thresholds: &[f64], raw: usize) -> usize {
    let raw = raw as f64;
    thresholds
        .iter()
        .position(|threshold| threshold + 1e-9 >= raw)
        .unwrap_or(thresholds.len().saturating_sub(1))
}

impl DurationSource for RandomGenerator {
    fn next_interarrival(&mut self, now: usize) -> usize {
        let sample = match &self.arrivals {
            ArrivalSampler::Uniform { min, max } => {
                let (min, max) = (*min, *max);
                self.rng.random_range(min..=max)
            }
            ArrivalSampler::SlotExponential {
                slot_minutes,
                rates,
            } => {
                let slot = (now / slot_minutes).min(rates.len() - 1);
                rates[slot].sample(&mut self.rng).ceil() as usize
            }
            ArrivalSampler::Table {
                values,
                divisor,
                max_units,
            } => {
                let raw = values[self.rng.random_range(0..values.len())];
                (raw / divisor + 1).min(*max_units)
            }
        };
        sample.max(1)
    }

    fn next_service(&mut self, _now: usize) -> usize {
        let sample = match &self.service {
            ServiceSampler::Uniform { min, max } => {
                let (min, max) = (*min, *max);
                self.rng.random_range(min..=max)
            }
            ServiceSampler::Discrete { index, durations } => durations[index.sample(&mut self.rng)],
            ServiceSampler::Table {
                values,
                thresholds,
                durations,
            } => {
                let raw = values[self.rng.random_range(0..values.len())];
                durations[inverse_cdf_bucket(thresholds, raw)]
            }
        };
        sample.max(1)
    }

    fn slot(&self, now: usize) -> usize {
        match &self.arrivals {
            ArrivalSampler::SlotExponential {
                slot_minutes,
                rates,
            } => (now / slot_minutes).min(rates.len() - 1),
            _ => 0,
        }
    }

    fn slot_count(&self) -> usize {
        match &self.arrivals {
            ArrivalSampler::SlotExponential { rates, .. } => rates.len(),
            _ => 1,
        }
    }
}

/// Deterministic source cycling through fixed sequences of durations.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    interarrivals: Vec<usize>,
    services: Vec<usize>,
    next_interarrival: usize,
    next_service: usize,
}

impl FixedGenerator {
    pub fn new(interarrival: usize, service: usize) -> Self {
        FixedGenerator::cycle(vec![interarrival], vec![service])
    }

    pub fn cycle(interarrivals: Vec<usize>, services: Vec<usize>) -> Self {
        FixedGenerator {
            interarrivals,
            services,
            next_interarrival: 0,
            next_service: 0,
        }
    }
}

fn cycled(values: &[usize], cursor: &mut usize) -> usize {
    if values.is_empty() {
        return 1;
    }
    let value = values[*cursor % values.len()];
    *cursor += 1;
    value.max(1)
}

impl DurationSource for FixedGenerator {
    fn next_interarrival(&mut self, _now: usize) -> usize {
        cycled(&self.interarrivals, &mut self.next_interarrival)
    }

    fn next_service(&mut self, _now: usize) -> usize {
        cycled(&self.services, &mut self.next_service)
    }
}
