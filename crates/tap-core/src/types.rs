//! Wire types exchanged with the grid simulator.
//!
//! Field names follow the control contract; the simulator's older names
//! (`task`, `current_tapchanger_position`, `tapchanger_voltage_factors`,
//! `current_rangecontrol_factor`) are accepted as aliases on input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SnapshotError;

/// Tap-changer command returned to the simulator.
///
/// Encoded on the wire as an integer: `0` lower, `1` higher, `2` stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapAction {
    /// Step down one position (lowers the secondary voltage).
    SwitchLower,
    /// Step up one position (raises the secondary voltage).
    SwitchHigher,
    /// Keep the current position.
    Stay,
}

impl TapAction {
    pub fn code(self) -> u8 {
        match self {
            TapAction::SwitchLower => 0,
            TapAction::SwitchHigher => 1,
            TapAction::Stay => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TapAction::SwitchLower),
            1 => Some(TapAction::SwitchHigher),
            2 => Some(TapAction::Stay),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TapAction::SwitchLower => "SWITCH_LOWER",
            TapAction::SwitchHigher => "SWITCH_HIGHER",
            TapAction::Stay => "STAY",
        }
    }

    /// Position offset this action applies to the tap.
    pub fn step(self) -> i32 {
        match self {
            TapAction::SwitchLower => -1,
            TapAction::SwitchHigher => 1,
            TapAction::Stay => 0,
        }
    }
}

impl fmt::Display for TapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for TapAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for TapAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        TapAction::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown tap action code {code}")))
    }
}

/// Task selector sent by the simulator.
///
/// The simulator has sent it both as a string (`"2"`) and as a bare
/// integer (`2`); both forms deserialize to the same id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    /// Numeric task index, if the id is an integer.
    pub fn number(&self) -> Option<u32> {
        self.0.trim().parse().ok()
    }
}

impl From<u32> for TaskId {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => TaskId(s),
            Raw::Number(n) => TaskId(n.to_string()),
        })
    }
}

/// One grid-state snapshot posted by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Selects the policy variant; empty when the simulator omits it.
    #[serde(default, alias = "task")]
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matriculation_number: Option<String>,

    /// Normal-operation voltage band.
    pub upper_voltage_band: f64,
    pub lower_voltage_band: f64,

    /// Hard limits that must never be crossed.
    pub upper_voltage_safety: f64,
    pub lower_voltage_safety: f64,

    pub min_step_position: i32,
    pub max_step_position: i32,

    /// Per-request nominal voltage; falls back to the configured reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_voltage: Option<f64>,

    #[serde(alias = "current_tapchanger_position")]
    pub current_tap_position: i32,

    /// Tap position → per-unit voltage multiplier.
    #[serde(alias = "tapchanger_voltage_factors")]
    pub tap_voltage_factors: BTreeMap<i32, f64>,

    #[serde(alias = "current_rangecontrol_factor")]
    pub range_control_factor: f64,

    /// Measured extremes since the last decision.
    pub min_street_voltage: f64,
    pub max_street_voltage: f64,
}

impl GridSnapshot {
    /// Voltage factor for a tap position, if the simulator supplied one.
    pub fn voltage_factor(&self, position: i32) -> Option<f64> {
        self.tap_voltage_factors.get(&position).copied()
    }

    pub fn at_max_step(&self) -> bool {
        self.current_tap_position >= self.max_step_position
    }

    pub fn at_min_step(&self) -> bool {
        self.current_tap_position <= self.min_step_position
    }

    /// Structural checks applied before a snapshot reaches the controller.
    ///
    /// Band and safety ordering is deliberately left unchecked; simulator
    /// scenarios place the safety limits inside the band.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let voltages = [
            ("upper_voltage_band", self.upper_voltage_band),
            ("lower_voltage_band", self.lower_voltage_band),
            ("upper_voltage_safety", self.upper_voltage_safety),
            ("lower_voltage_safety", self.lower_voltage_safety),
            ("range_control_factor", self.range_control_factor),
            ("min_street_voltage", self.min_street_voltage),
            ("max_street_voltage", self.max_street_voltage),
        ];
        for (field, value) in voltages {
            if !value.is_finite() {
                return Err(SnapshotError::NonFinite { field });
            }
        }
        if let Some(nominal) = self.nominal_voltage
            && !(nominal.is_finite() && nominal > 0.0)
        {
            return Err(SnapshotError::InvalidNominalVoltage(nominal));
        }

        if self.min_step_position > self.max_step_position {
            return Err(SnapshotError::InvertedStepRange {
                min: self.min_step_position,
                max: self.max_step_position,
            });
        }
        if !(self.min_step_position..=self.max_step_position).contains(&self.current_tap_position) {
            return Err(SnapshotError::TapOutOfRange {
                position: self.current_tap_position,
                min: self.min_step_position,
                max: self.max_step_position,
            });
        }

        if self.min_street_voltage > self.max_street_voltage {
            return Err(SnapshotError::InvertedStreetVoltages {
                min: self.min_street_voltage,
                max: self.max_street_voltage,
            });
        }

        if let Some((&position, _)) = self
            .tap_voltage_factors
            .iter()
            .find(|(_, factor)| !factor.is_finite())
        {
            return Err(SnapshotError::NonFiniteFactor { position });
        }

        Ok(())
    }
}

/// Control decision returned for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlDecision {
    pub tap_action: TapAction,
    pub spreading_detected: bool,
    pub range_control_factor: f64,
}

/// Liveness payload for the heartbeat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatInfo {
    pub is_alive: bool,
}
