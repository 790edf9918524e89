//! Service configuration (`tapd.toml`).
//!
//! Every section is optional; missing keys take their defaults.
//!
//! ```toml
//! [server]
//! port = 7777
//!
//! [simulator]
//! url = "http://localhost:3000/"
//!
//! [registration]
//! attempts = 3
//!
//! [controller]
//! nominal_voltage = 230.0
//! range_control = { rule = "reset", value = 0.5 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decision::DEFAULT_NOMINAL_VOLTAGE;
use crate::error::ConfigError;
use crate::policy::TaskPolicy;
use crate::range::RangeControlPolicy;

pub const DEFAULT_PORT: u16 = 7777;
pub const DEFAULT_SIMULATOR_PORT: u16 = 3000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub simulator: SimulatorConfig,
    pub registration: RegistrationConfig,
    pub controller: ControllerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Where the simulator lives and how it reaches us back.
///
/// Both are usually left unset and resolved from `BACKEND_URL` /
/// `STUDENTTASK_URL` at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub attempts: u32,
    /// Initial retry delay; doubles after each failed attempt.
    pub backoff_ms: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 1000,
            attempts: 3,
            backoff_ms: 500,
        }
    }
}

/// Tunables for the decision function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Reference voltage for the look-ahead estimate, used when the
    /// snapshot does not carry its own.
    pub nominal_voltage: f64,
    /// Rule applied to every task, replacing the per-policy defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_control: Option<RangeControlPolicy>,
    /// Rule used by the spreading-compensation task.
    pub compensation: RangeControlPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            nominal_voltage: DEFAULT_NOMINAL_VOLTAGE,
            range_control: None,
            compensation: RangeControlPolicy::COMPENSATION,
        }
    }
}

impl ControllerConfig {
    /// Range control rule in effect for a policy.
    pub fn range_policy_for(&self, policy: TaskPolicy) -> RangeControlPolicy {
        if let Some(rule) = self.range_control {
            return rule;
        }
        match policy {
            TaskPolicy::SpreadingCompensation => self.compensation,
            _ => RangeControlPolicy::Echo,
        }
    }
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nominal = self.controller.nominal_voltage;
        if !(nominal.is_finite() && nominal > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "controller.nominal_voltage must be positive, got {nominal}"
            )));
        }
        if let Some(rule) = &self.controller.range_control {
            rule.check().map_err(ConfigError::Invalid)?;
        }
        self.controller.compensation.check().map_err(ConfigError::Invalid)?;

        if self.registration.attempts == 0 {
            return Err(ConfigError::Invalid(
                "registration.attempts must be at least 1".to_string(),
            ));
        }
        if self.registration.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "registration.timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
