use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Minutes per arrival-rate slot in the library scenario
pub const LIBRARY_SLOT_MINUTES: usize = 120;
/// Library opening hours, in minutes
pub const LIBRARY_DAY_MINUTES: usize = 14 * 60;
/// Upper bound on one customer's stay at the bank, used to derive the horizon
pub const BANK_MAX_ENTITY_TIME: usize = 8;

const BANK_SERVICE_WEIGHTS: [f64; 8] = [0.10, 0.07, 0.08, 0.5, 0.06, 0.07, 0.07, 0.05];
const BANK_INTERARRIVAL_TABLE: [usize; 8] = [913, 727, 15, 948, 309, 922, 413, 20];
const BANK_SERVICE_TABLE: [usize; 8] = [84, 10, 74, 53, 17, 79, 45, 98];
const LIBRARY_INTERARRIVAL_MEANS: [f64; 7] = [5.7, 3.3, 1.8, 2.5, 4.8, 6.2, 10.7];

/// How interarrival gaps are drawn in parametric mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrivalModel {
    /// Uniform integer minutes in `min..=max`
    Uniform { min: usize, max: usize },
    /// Exponential with a mean that depends on the slot of the clock,
    /// rounded up to whole minutes. Past the last slot the last mean applies.
    SlotExponential { slot_minutes: usize, means: Vec<f64> },
}

/// How service durations are drawn in parametric mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceModel {
    /// Uniform integer minutes in `min..=max`
    Uniform { min: usize, max: usize },
    /// Probability mass over durations `1..=weights.len()`
    Discrete { weights: Vec<f64> },
}

impl ServiceModel {
    /// Durations and their probabilities, in increasing duration order.
    pub fn support(&self) -> (Vec<usize>, Vec<f64>) {
        match self {
            ServiceModel::Uniform { min, max } => {
                let durations: Vec<usize> = (*min..=*max).collect();
                let p = 1.0 / durations.len().max(1) as f64;
                let probabilities = vec![p; durations.len()];
                (durations, probabilities)
            }
            ServiceModel::Discrete { weights } => {
                let total: f64 = weights.iter().sum();
                let durations = (1..=weights.len()).collect();
                let probabilities = weights.iter().map(|w| w / total).collect();
                (durations, probabilities)
            }
        }
    }
}

/// Historical raw values, each in `0..value_range`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalTable {
    pub values: Vec<usize>,
    pub value_range: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMode {
    pub interarrival: EmpiricalTable,
    pub service: EmpiricalTable,
}

/// Granularity at which unoccupied time is accrued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleGranularity {
    /// Each server accrues its own gap between a release and its next grant
    Server,
    /// One gap per interval in which every server was free
    Pool,
}

/// Everything a run needs to know before it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    /// Entities admitted per run; `None` keeps admitting until the horizon
    pub entity_count: Option<usize>,
    /// Repeated runs sharing one random stream
    pub day_count: usize,
    pub server_count: usize,
    pub use_table_mode: bool,
    pub random_seed: u64,
    /// Explicit cutoff; otherwise `entity_count * max_entity_time`
    pub run_horizon: Option<usize>,
    pub max_entity_time: usize,
    pub idle_granularity: IdleGranularity,
    pub arrivals: ArrivalModel,
    pub service: ServiceModel,
    pub tables: Option<TableMode>,
}

impl ScenarioConfig {
    /// Single teller, customers arrive 1-8 minutes apart.
    pub fn bank(entity_count: usize) -> Self {
        ScenarioConfig {
            name: "bank".to_string(),
            entity_count: Some(entity_count),
            day_count: 1,
            server_count: 1,
            use_table_mode: false,
            random_seed: 0,
            run_horizon: None,
            max_entity_time: BANK_MAX_ENTITY_TIME,
            idle_granularity: IdleGranularity::Server,
            arrivals: ArrivalModel::Uniform { min: 1, max: 8 },
            service: ServiceModel::Discrete {
                weights: BANK_SERVICE_WEIGHTS.to_vec(),
            },
            tables: Some(TableMode {
                interarrival: EmpiricalTable {
                    values: BANK_INTERARRIVAL_TABLE.to_vec(),
                    value_range: 1000,
                },
                service: EmpiricalTable {
                    values: BANK_SERVICE_TABLE.to_vec(),
                    value_range: 100,
                },
            }),
        }
    }

    /// Library service desk open 08:00-22:00, arrival rate varying every
    /// two hours.
    pub fn library(day_count: usize, server_count: usize) -> Self {
        ScenarioConfig {
            name: "library".to_string(),
            entity_count: None,
            day_count,
            server_count,
            use_table_mode: false,
            random_seed: 0,
            run_horizon: Some(LIBRARY_DAY_MINUTES),
            max_entity_time: BANK_MAX_ENTITY_TIME,
            idle_granularity: IdleGranularity::Pool,
            arrivals: ArrivalModel::SlotExponential {
                slot_minutes: LIBRARY_SLOT_MINUTES,
                means: LIBRARY_INTERARRIVAL_MEANS.to_vec(),
            },
            service: ServiceModel::Uniform { min: 1, max: 5 },
            tables: None,
        }
    }

    /// Switch to empirical-table sampling. The run is sized to the table, so
    /// each historical record stands for one entity.
    pub fn with_table_mode(mut self) -> Self {
        self.use_table_mode = true;
        if let Some(tables) = &self.tables {
            self.entity_count = Some(tables.interarrival.values.len());
        }
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SimError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, SimError> {
        let s = fs::read_to_string(path).map_err(|source| SimError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn horizon(&self) -> Result<usize, SimError> {
        self.run_horizon
            .or_else(|| self.entity_count.map(|n| n * self.max_entity_time))
            .ok_or(SimError::MissingHorizon)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        positive("entity_count", self.entity_count)?;
        positive("day_count", Some(self.day_count))?;
        positive("server_count", Some(self.server_count))?;
        positive("run_horizon", self.run_horizon)?;
        positive("horizon", Some(self.horizon()?))?;

        match &self.arrivals {
            ArrivalModel::Uniform { min, max } => check_range("arrivals", *min, *max)?,
            ArrivalModel::SlotExponential {
                slot_minutes,
                means,
            } => {
                positive("slot_minutes", Some(*slot_minutes))?;
                if means.is_empty() || means.iter().any(|m| !m.is_finite() || *m <= 0.0) {
                    return Err(SimError::InvalidDistribution(
                        "slot means must be non-empty, finite and positive".to_string(),
                    ));
                }
            }
        }

        match &self.service {
            ServiceModel::Uniform { min, max } => check_range("service", *min, *max)?,
            ServiceModel::Discrete { weights } => {
                let total: f64 = weights.iter().sum();
                if weights.is_empty()
                    || weights.iter().any(|w| !w.is_finite() || *w < 0.0)
                    || total <= 0.0
                {
                    return Err(SimError::InvalidDistribution(
                        "service weights must be non-negative with a positive sum".to_string(),
                    ));
                }
            }
        }

        if self.use_table_mode {
            let tables = self.tables.as_ref().ok_or(SimError::EmptyTable {
                name: "interarrival",
            })?;
            check_table("interarrival", &tables.interarrival)?;
            check_table("service", &tables.service)?;
        }

        Ok(())
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig::library(100, 2)
    }
}

fn positive(name: &'static str, value: Option<usize>) -> Result<(), SimError> {
    match value {
        Some(0) => Err(SimError::InvalidCount { name, value: 0 }),
        _ => Ok(()),
    }
}

fn check_range(name: &str, min: usize, max: usize) -> Result<(), SimError> {
    if min == 0 || min > max {
        return Err(SimError::InvalidDistribution(format!(
            "{} range {}..={} must be positive and non-empty",
            name, min, max
        )));
    }
    Ok(())
}

fn check_table(name: &'static str, table: &EmpiricalTable) -> Result<(), SimError> {
    if table.values.is_empty() {
        return Err(SimError::EmptyTable { name });
    }
    positive("value_range", Some(table.value_range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(ScenarioConfig::bank(100).validate().is_ok());
        assert!(ScenarioConfig::bank(100).with_table_mode().validate().is_ok());
        assert!(ScenarioConfig::library(100, 2).validate().is_ok());
    }

    #[test]
    fn bank_horizon_derives_from_entity_count() {
        assert_eq!(ScenarioConfig::bank(100).horizon().unwrap(), 800);
        assert_eq!(
            ScenarioConfig::bank(100).with_table_mode().horizon().unwrap(),
            64
        );
    }

    #[test]
    fn zero_counts_fail_fast() {
        let mut config = ScenarioConfig::library(1, 2);
        config.server_count = 0;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidCount {
                name: "server_count",
                ..
            })
        ));

        let config = ScenarioConfig::library(0, 2);
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidCount {
                name: "day_count",
                ..
            })
        ));

        let config = ScenarioConfig::bank(0);
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidCount {
                name: "entity_count",
                ..
            })
        ));
    }

    #[test]
    fn empty_table_fails_fast() {
        let mut config = ScenarioConfig::bank(8).with_table_mode();
        if let Some(tables) = config.tables.as_mut() {
            tables.service.values.clear();
        }
        assert!(matches!(
            config.validate(),
            Err(SimError::EmptyTable { name: "service" })
        ));
    }

    #[test]
    fn missing_horizon_is_rejected() {
        let mut config = ScenarioConfig::library(1, 1);
        config.run_horizon = None;
        assert!(matches!(config.validate(), Err(SimError::MissingHorizon)));
    }

    #[test]
    fn discrete_support_is_normalised() {
        let (durations, probabilities) = ServiceModel::Discrete {
            weights: vec![1.0, 3.0],
        }
        .support();
        assert_eq!(durations, vec![1, 2]);
        assert_eq!(probabilities, vec![0.25, 0.75]);
    }

    #[test]
    fn bundled_scenario_parses() {
        let config =
            ScenarioConfig::from_toml_str(include_str!("../scenarios/library_three_counters.toml"))
                .unwrap();
        assert_eq!(config.server_count, 3);
        assert_eq!(config.day_count, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = ScenarioConfig::from_toml_str(
            r#"
            day_count = 3
            server_count = 4
            random_seed = 7

            [service]
            kind = "uniform"
            min = 2
            max = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.day_count, 3);
        assert_eq!(config.server_count, 4);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.service, ServiceModel::Uniform { min: 2, max: 6 });
        assert_eq!(config.run_horizon, Some(LIBRARY_DAY_MINUTES));
        assert_eq!(config.idle_granularity, IdleGranularity::Pool);
    }
}
