//! Range-control-factor adjustment.
//!
//! How the factor should evolve has never been pinned down, so the
//! controller delegates it to a [`RangeControlRule`]. The built-in
//! [`RangeControlPolicy`] covers the variants seen in practice and can be
//! selected from configuration; anything else can be plugged in from code.

use serde::{Deserialize, Serialize};

use crate::policy::TaskPolicy;
use crate::types::{GridSnapshot, TapAction};

/// Everything a rule may look at when adjusting the factor.
#[derive(Debug, Clone, Copy)]
pub struct RangeContext<'a> {
    pub snapshot: &'a GridSnapshot,
    pub policy: TaskPolicy,
    /// Final action, after any spreading suppression.
    pub tap_action: TapAction,
    pub spreading_detected: bool,
}

impl RangeContext<'_> {
    /// Factor received with the snapshot.
    pub fn current(&self) -> f64 {
        self.snapshot.range_control_factor
    }
}

/// Computes the outgoing range control factor.
pub trait RangeControlRule: Send + Sync {
    fn adjust(&self, ctx: &RangeContext<'_>) -> f64;
}

impl<F> RangeControlRule for F
where
    F: Fn(&RangeContext<'_>) -> f64 + Send + Sync,
{
    fn adjust(&self, ctx: &RangeContext<'_>) -> f64 {
        self(ctx)
    }
}

/// Built-in range control rules.
///
/// In TOML: `{ rule = "reset", value = 0.5 }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RangeControlPolicy {
    /// Return the incoming factor unchanged.
    #[default]
    Echo,
    /// Always return `value`.
    Reset { value: f64 },
    /// Lower by `step` when switching higher, raise by `step` when
    /// switching lower, return `reset_value` when staying.
    Step { step: f64, reset_value: f64 },
    /// Lower by `step` when spreading was detected. The result is clamped
    /// to `[min, max]`; without spreading the input is returned unchanged.
    OnSpreading { step: f64, min: f64, max: f64 },
}

impl RangeControlPolicy {
    /// Default correction used by the spreading-compensation task.
    pub const COMPENSATION: RangeControlPolicy = RangeControlPolicy::OnSpreading {
        step: 0.1,
        min: 0.0,
        max: 1.0,
    };

    pub fn label(&self) -> &'static str {
        match self {
            RangeControlPolicy::Echo => "echo",
            RangeControlPolicy::Reset { .. } => "reset",
            RangeControlPolicy::Step { .. } => "step",
            RangeControlPolicy::OnSpreading { .. } => "on_spreading",
        }
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        let values = match *self {
            RangeControlPolicy::Echo => vec![],
            RangeControlPolicy::Reset { value } => vec![("value", value)],
            RangeControlPolicy::Step { step, reset_value } => {
                vec![("step", step), ("reset_value", reset_value)]
            }
            RangeControlPolicy::OnSpreading { step, min, max } => {
                vec![("step", step), ("min", min), ("max", max)]
            }
        };
        if let Some((name, v)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{} rule: {name} must be finite, got {v}", self.label()));
        }
        match *self {
            RangeControlPolicy::OnSpreading { min, max, .. } if min > max => Err(format!(
                "{} rule: min ({min}) must not exceed max ({max})",
                self.label()
            )),
            _ => Ok(()),
        }
    }
}

impl RangeControlRule for RangeControlPolicy {
    fn adjust(&self, ctx: &RangeContext<'_>) -> f64 {
        let current = ctx.current();
        match *self {
            RangeControlPolicy::Echo => current,
            RangeControlPolicy::Reset { value } => value,
            RangeControlPolicy::Step { step, reset_value } => match ctx.tap_action {
                TapAction::SwitchHigher => current - step,
                TapAction::SwitchLower => current + step,
                TapAction::Stay => reset_value,
            },
            RangeControlPolicy::OnSpreading { step, min, max } => {
                if ctx.spreading_detected {
                    (current - step).clamp(min, max)
                } else {
                    current
                }
            }
        }
    }
}
