use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a run before it starts, or stop the binary from
/// writing its results.
///
/// Sampling never fails once a generator is built: out-of-range table
/// lookups clamp to the last bucket. Entities cut off by the horizon are
/// reported through `RunStatistics::truncated`, not as an error.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("{name} must be positive, got {value}")]
    InvalidCount { name: &'static str, value: usize },

    #[error("empirical table `{name}` has no entries")]
    EmptyTable { name: &'static str },

    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("no run horizon: set run_horizon or entity_count")]
    MissingHorizon,

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
