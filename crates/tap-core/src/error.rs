//! Error types for snapshot validation and configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Structural problems in a snapshot that the controller cannot act on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("voltage factor for tap {position} is not a finite number")]
    NonFiniteFactor { position: i32 },

    #[error("nominal voltage must be positive, got {0}")]
    InvalidNominalVoltage(f64),

    #[error("step range is inverted: min {min} > max {max}")]
    InvertedStepRange { min: i32, max: i32 },

    #[error("tap position {position} outside step range [{min}, {max}]")]
    TapOutOfRange { position: i32, min: i32, max: i32 },

    #[error("street voltages are inverted: min {min} > max {max}")]
    InvertedStreetVoltages { min: f64, max: f64 },
}

/// Errors while loading the service configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
