//! tap-core — tap-changer control decisions for a simulated low-voltage grid.
//!
//! A simulator posts a [`GridSnapshot`] on every cycle and expects a
//! [`ControlDecision`] back. The decision is a pure function of the snapshot
//! and the [`ControllerConfig`]; no state survives between calls.
//!
//! # Decision Algorithm
//!
//! ```text
//! policy = TaskPolicy::from_task_id(snapshot.task_id)
//! limits = safety limits if policy uses them, else band limits
//!
//! if min_street_voltage < limits.lower:
//!     SWITCH_HIGHER unless the tap is at max_step_position
//! elif max_street_voltage > limits.upper:
//!     SWITCH_LOWER unless the tap is at min_step_position
//! else:
//!     STAY
//!
//! if policy looks ahead and the action moves the tap:
//!     delta = (factor[current] - factor[target]) * nominal_voltage
//!     raising:  spreading if max_street_voltage - delta > limits.upper
//!     lowering: spreading if min_street_voltage - delta < limits.lower
//!     spreading suppresses the move (STAY)
//!
//! range_control_factor = RangeControlRule::adjust(...)
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod policy;
pub mod range;
pub mod types;

pub use config::{ControllerConfig, ServiceConfig};
pub use decision::{decide, Controller, Violation, VoltageLimits, DEFAULT_NOMINAL_VOLTAGE};
pub use error::{ConfigError, SnapshotError};
pub use policy::TaskPolicy;
pub use range::{RangeContext, RangeControlPolicy, RangeControlRule};
pub use types::*;
