//! The tap-control decision function.
//!
//! [`Controller::decide`] is total: every structurally valid snapshot maps
//! to exactly one [`ControlDecision`], and a tap already at its rail yields
//! `STAY` rather than an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::policy::TaskPolicy;
use crate::range::{RangeContext, RangeControlRule};
use crate::types::{ControlDecision, GridSnapshot, TapAction};

/// Nominal low-voltage grid reference in volts.
pub const DEFAULT_NOMINAL_VOLTAGE: f64 = 230.0;

/// Which limit the street voltages crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    BelowLower,
    AboveUpper,
}

/// Effective voltage limits for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageLimits {
    pub lower: f64,
    pub upper: f64,
}

impl VoltageLimits {
    pub fn for_policy(snapshot: &GridSnapshot, policy: TaskPolicy) -> Self {
        if policy.uses_safety_limits() {
            Self {
                lower: snapshot.lower_voltage_safety,
                upper: snapshot.upper_voltage_safety,
            }
        } else {
            Self {
                lower: snapshot.lower_voltage_band,
                upper: snapshot.upper_voltage_band,
            }
        }
    }

    /// Lower-limit violations take precedence over upper-limit ones.
    pub fn violation(&self, snapshot: &GridSnapshot) -> Option<Violation> {
        if snapshot.min_street_voltage < self.lower {
            Some(Violation::BelowLower)
        } else if snapshot.max_street_voltage > self.upper {
            Some(Violation::AboveUpper)
        } else {
            None
        }
    }
}

/// Evaluates snapshots against the configured policies.
///
/// Holds no per-call state; share it behind an `Arc` across request handlers.
pub struct Controller {
    config: ControllerConfig,
    /// Overrides every configured range rule when set.
    range_rule: Option<Arc<dyn RangeControlRule>>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            range_rule: None,
        }
    }

    /// Plug in a custom range-control-factor rule.
    pub fn with_range_rule(mut self, rule: Arc<dyn RangeControlRule>) -> Self {
        self.range_rule = Some(rule);
        self
    }

    /// Produce the control decision for one snapshot.
    pub fn decide(&self, snapshot: &GridSnapshot) -> ControlDecision {
        let policy = TaskPolicy::from_task_id(&snapshot.task_id);
        let limits = VoltageLimits::for_policy(snapshot, policy);
        let violation = limits.violation(snapshot);

        let mut tap_action = match violation {
            Some(Violation::BelowLower) if !snapshot.at_max_step() => TapAction::SwitchHigher,
            Some(Violation::AboveUpper) if !snapshot.at_min_step() => TapAction::SwitchLower,
            Some(v) => {
                debug!(
                    violation = ?v,
                    position = snapshot.current_tap_position,
                    "tap at rail, cannot correct"
                );
                TapAction::Stay
            }
            None => TapAction::Stay,
        };

        let mut spreading_detected = false;
        if policy.detects_spreading()
            && tap_action != TapAction::Stay
            && let Some(v) = violation
        {
            spreading_detected = self.spreading_ahead(snapshot, limits, tap_action, v);
            if spreading_detected {
                debug!(suppressed = %tap_action, "spreading detected, holding position");
                tap_action = TapAction::Stay;
            }
        }

        let ctx = RangeContext {
            snapshot,
            policy,
            tap_action,
            spreading_detected,
        };
        let range_control_factor = match &self.range_rule {
            Some(rule) => rule.adjust(&ctx),
            None => self.config.range_policy_for(policy).adjust(&ctx),
        };

        info!(
            task = %snapshot.task_id,
            policy = policy.label(),
            position = snapshot.current_tap_position,
            min_voltage = snapshot.min_street_voltage,
            max_voltage = snapshot.max_street_voltage,
            action = %tap_action,
            spreading = spreading_detected,
            range_control_factor,
            "control decision"
        );

        ControlDecision {
            tap_action,
            spreading_detected,
            range_control_factor,
        }
    }

    /// Whether the candidate move would push the opposite extreme past
    /// its limit.
    fn spreading_ahead(
        &self,
        snapshot: &GridSnapshot,
        limits: VoltageLimits,
        action: TapAction,
        violation: Violation,
    ) -> bool {
        let current = snapshot.current_tap_position;
        let target = current + action.step();

        let (Some(current_factor), Some(target_factor)) =
            (snapshot.voltage_factor(current), snapshot.voltage_factor(target))
        else {
            warn!(current, target, "missing tap voltage factor, skipping look-ahead");
            return false;
        };

        let nominal = snapshot.nominal_voltage.unwrap_or(self.config.nominal_voltage);
        let delta = (current_factor - target_factor) * nominal;

        match violation {
            Violation::BelowLower => {
                let projected_max = snapshot.max_street_voltage - delta;
                debug!(projected_max, upper = limits.upper, "look-ahead after raising");
                projected_max > limits.upper
            }
            Violation::AboveUpper => {
                let projected_min = snapshot.min_street_voltage - delta;
                debug!(projected_min, lower = limits.lower, "look-ahead after lowering");
                projected_min < limits.lower
            }
        }
    }
}

/// Decide with the default controller configuration.
pub fn decide(snapshot: &GridSnapshot) -> ControlDecision {
    Controller::default().decide(snapshot)
}
